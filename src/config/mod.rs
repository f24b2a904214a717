pub mod radar;

pub use radar::RadarConfig;
