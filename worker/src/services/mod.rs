pub mod reconciliation_loop;
