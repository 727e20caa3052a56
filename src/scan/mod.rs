pub mod classifier;
pub mod config;
pub mod extract;
pub mod scan_model;
pub mod scanner;

pub use classifier::classify;
pub use config::{PatternList, Predicate, ScanConfig, StringList};
pub use scan_model::{
    DescriptorMetadata, ElementDescriptor, ElementType, ElementValue, ScanMetadata, ScanOutput,
    SelectMetadata, SelectOption,
};
pub use scanner::Scanner;
