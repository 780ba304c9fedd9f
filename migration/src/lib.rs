pub use sea_orm_migration::prelude::*;

mod m20240101_000001_create_administrations;
mod m20240101_000002_create_accounts;
mod m20240101_000003_create_vat_codes;
mod m20240101_000004_create_parties;
mod m20240101_000005_create_periods;
mod m20240101_000006_create_journal_entries;
mod m20240101_000007_create_journal_lines;
mod m20240101_000008_create_open_items;
mod m20240101_000009_create_fixed_assets;
mod m20240101_000010_create_issues;
mod m20240101_000011_create_bank_reconciliation;
mod m20240101_000012_create_entry_counters;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240101_000001_create_administrations::Migration),
            Box::new(m20240101_000002_create_accounts::Migration),
            Box::new(m20240101_000003_create_vat_codes::Migration),
            Box::new(m20240101_000004_create_parties::Migration),
            Box::new(m20240101_000005_create_periods::Migration),
            Box::new(m20240101_000006_create_journal_entries::Migration),
            Box::new(m20240101_000007_create_journal_lines::Migration),
            Box::new(m20240101_000008_create_open_items::Migration),
            Box::new(m20240101_000009_create_fixed_assets::Migration),
            Box::new(m20240101_000010_create_issues::Migration),
            Box::new(m20240101_000011_create_bank_reconciliation::Migration),
            Box::new(m20240101_000012_create_entry_counters::Migration),
        ]
    }
}
