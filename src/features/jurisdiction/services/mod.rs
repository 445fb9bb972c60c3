mod jurisdiction_service;

pub use jurisdiction_service::JurisdictionService;
