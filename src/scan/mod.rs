// Chart Folder Scanner - Notes file selection, hashing and parsing

pub mod folder;

pub use folder::{
    calculate_md5, read_folder, scan_chart, scan_chart_dir, ChartScan, FolderFile, FolderIssue,
    ScanError,
};
