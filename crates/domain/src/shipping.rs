//! Shipping selection sum type and the static agency directory.
//!
//! A checkout ships either to the buyer's address or to a carrier agency
//! for pickup. Each method carries its own structured payload and is
//! validated before it ever reaches the checkout orchestrator.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised validating a shipping selection.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ShippingError {
    /// A required free-text field was empty.
    #[error("Invalid shipping payload: missing {0}")]
    MissingField(&'static str),

    /// The agency id does not resolve against the directory.
    #[error("Unknown shipping agency: {0}")]
    UnknownAgency(String),
}

/// A structured street address for home delivery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    pub street: String,
    pub city: String,
    pub region: String,
    pub postal_code: Option<String>,
}

/// Home delivery payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HomeDelivery {
    pub recipient_name: String,
    pub phone: String,
    pub address: Address,
}

/// Agency pickup payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgencyPickup {
    /// Resolved against [`AgencyDirectory`] during validation.
    pub agency_id: String,
    pub pickup_name: String,
    pub pickup_document: Option<String>,
}

/// The buyer's chosen shipping method.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ShippingSelection {
    Home(HomeDelivery),
    Agency(AgencyPickup),
}

impl ShippingSelection {
    /// Validates the payload, resolving agency selections against the
    /// directory. Runs before any persistence is attempted.
    pub fn validate(&self, directory: &AgencyDirectory) -> Result<(), ShippingError> {
        match self {
            ShippingSelection::Home(home) => {
                if home.recipient_name.trim().is_empty() {
                    return Err(ShippingError::MissingField("recipient_name"));
                }
                if home.phone.trim().is_empty() {
                    return Err(ShippingError::MissingField("phone"));
                }
                if home.address.street.trim().is_empty() {
                    return Err(ShippingError::MissingField("street"));
                }
                if home.address.city.trim().is_empty() {
                    return Err(ShippingError::MissingField("city"));
                }
                Ok(())
            }
            ShippingSelection::Agency(pickup) => {
                if pickup.pickup_name.trim().is_empty() {
                    return Err(ShippingError::MissingField("pickup_name"));
                }
                if directory.agency_by_id(&pickup.agency_id).is_none() {
                    return Err(ShippingError::UnknownAgency(pickup.agency_id.clone()));
                }
                Ok(())
            }
        }
    }
}

/// A carrier pickup agency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Agency {
    pub id: &'static str,
    pub region: &'static str,
    pub name: &'static str,
    pub address: &'static str,
}

/// Read-only directory of carrier agencies, consulted only to validate
/// agency shipping selections and to serve the boundary's lookup endpoint.
#[derive(Debug, Clone, Copy, Default)]
pub struct AgencyDirectory;

const AGENCIES: &[Agency] = &[
    Agency { id: "agency-montevideo-cerro", region: "Montevideo", name: "Cerro", address: "Perú 2068, Montevideo" },
    Agency { id: "agency-montevideo-av-italia", region: "Montevideo", name: "Av. Italia", address: "Av. Italia 5680, Montevideo" },
    Agency { id: "agency-montevideo-ciudad-vieja", region: "Montevideo", name: "Ciudad Vieja", address: "Juan Carlos Gómez 1447, Montevideo" },
    Agency { id: "agency-montevideo-tres-cruces", region: "Montevideo", name: "Tres Cruces", address: "Terminal Tres Cruces, Bv. Artigas, Montevideo" },
    Agency { id: "agency-montevideo-paso-molino", region: "Montevideo", name: "Paso Molino", address: "Mariano Sagasta 64, Montevideo" },
    Agency { id: "agency-canelones-canelones", region: "Canelones", name: "Canelones", address: "José Batlle y Ordóñez 310, Canelones" },
    Agency { id: "agency-colonia-carmelo", region: "Colonia", name: "Carmelo", address: "18 de Julio 411, Colonia" },
    Agency { id: "agency-colonia-terminal", region: "Colonia", name: "Colonia Terminal", address: "Terminal Av. Roosevelt, Colonia" },
    Agency { id: "agency-maldonado-maldonado", region: "Maldonado", name: "Maldonado", address: "Santa Teresa 600, Maldonado" },
    Agency { id: "agency-maldonado-piriapolis", region: "Maldonado", name: "Piriápolis", address: "Zolezzi 842, Maldonado" },
    Agency { id: "agency-salto-terminal", region: "Salto", name: "Salto Terminal", address: "Av. Batlle 2265, Salto" },
    Agency { id: "agency-paysandu-terminal", region: "Paysandú", name: "Paysandú Terminal", address: "Bulevar Artigas 770, Paysandú" },
    Agency { id: "agency-rocha-rocha", region: "Rocha", name: "Rocha", address: "Lavalleja 67 Bis, Rocha" },
    Agency { id: "agency-tacuarembo-terminal", region: "Tacuarembó", name: "Tacuarembó Terminal", address: "Terminal Carlos Gardel, Tacuarembó" },
];

impl AgencyDirectory {
    /// Creates a directory handle.
    pub fn new() -> Self {
        Self
    }

    /// Looks up an agency by id.
    pub fn agency_by_id(&self, id: &str) -> Option<&'static Agency> {
        AGENCIES.iter().find(|a| a.id == id)
    }

    /// Lists agencies, optionally filtered by region (case-insensitive).
    pub fn agencies(&self, region: Option<&str>) -> Vec<&'static Agency> {
        match region {
            None => AGENCIES.iter().collect(),
            Some(r) => {
                let wanted = r.trim().to_lowercase();
                AGENCIES
                    .iter()
                    .filter(|a| a.region.to_lowercase() == wanted)
                    .collect()
            }
        }
    }
}
