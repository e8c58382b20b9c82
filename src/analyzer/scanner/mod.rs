pub mod file_scanner;

pub use file_scanner::{FileScanner, ScanResult, ScannedFile, is_excluded, relative_key};
