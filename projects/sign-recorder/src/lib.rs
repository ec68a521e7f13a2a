pub mod cli;
pub mod dataset;
pub mod display;
pub mod pose;
pub mod recorder;
pub mod segmentation;
pub mod video;
