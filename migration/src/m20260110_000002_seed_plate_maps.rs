use sea_orm_migration::prelude::*;

/// Seeds the maps table with well locations for the standard plate
/// formats (96 and 384 wells). Plate creation resolves every well
/// location against this table, scoped by asset size.
#[derive(DeriveMigrationName)]
pub struct Migration;

const STANDARD_FORMATS: &[(u8, u8)] = &[(8, 12), (16, 24)];

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let mut insert = Query::insert()
            .into_table(Maps::Table)
            .columns([Maps::Description, Maps::AssetSize])
            .to_owned();

        for &(rows, columns) in STANDARD_FORMATS {
            let asset_size = i32::from(rows) * i32::from(columns);
            for row in 0..rows {
                let letter = char::from(b'A' + row);
                for column in 1..=columns {
                    insert.values_panic([format!("{letter}{column}").into(), asset_size.into()]);
                }
            }
        }

        manager.exec_stmt(insert).await?;
        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let sizes: Vec<i32> = STANDARD_FORMATS
            .iter()
            .map(|&(rows, columns)| i32::from(rows) * i32::from(columns))
            .collect();

        manager
            .exec_stmt(
                Query::delete()
                    .from_table(Maps::Table)
                    .and_where(Expr::col(Maps::AssetSize).is_in(sizes))
                    .to_owned(),
            )
            .await?;
        Ok(())
    }
}

#[derive(DeriveIden)]
enum Maps {
    Table,
    Description,
    AssetSize,
}
