pub mod visit_seattle;
