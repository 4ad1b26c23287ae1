pub mod auditor;
pub mod router;
pub mod stock_plate;
