pub mod aliquots;
pub mod assets;
pub mod container_associations;
pub mod maps;
pub mod uuids;
