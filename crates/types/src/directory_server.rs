//! 3DS2 directory server registry.
//!
//! Each card network runs its own directory server, identified by a registered application
//! provider id and trusted through the network's root certificate. The table is fixed at
//! compile time: looking up a network that is not listed yields `None`, never a default.
//!
//! Some networks require the key used to encrypt device data to be named explicitly
//! (`key_id`); others do not. That is a property of the network, so it lives here next to the
//! certificate rather than on any transaction.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Encryption algorithm used for every bundled directory server key
pub const ALGORITHM_RSA: &str = "RSA";

/// A card network's 3DS2 directory server
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DirectoryServer {
    Visa,
    Mastercard,
    #[serde(rename = "american_express")]
    Amex,
    Discover,
}

impl DirectoryServer {
    /// All registered directory servers
    pub const ALL: [DirectoryServer; 4] = [
        DirectoryServer::Visa,
        DirectoryServer::Mastercard,
        DirectoryServer::Amex,
        DirectoryServer::Discover,
    ];

    /// Resolve a network name as sent by the backend (`directory_server_name`)
    pub fn lookup(network: &str) -> Option<Self> {
        match normalize(network).as_str() {
            "visa" => Some(DirectoryServer::Visa),
            "mastercard" => Some(DirectoryServer::Mastercard),
            "american_express" | "amex" => Some(DirectoryServer::Amex),
            "discover" => Some(DirectoryServer::Discover),
            _ => None,
        }
    }

    /// Canonical network name
    pub fn name(self) -> &'static str {
        match self {
            DirectoryServer::Visa => "visa",
            DirectoryServer::Mastercard => "mastercard",
            DirectoryServer::Amex => "american_express",
            DirectoryServer::Discover => "discover",
        }
    }

    /// Registered application provider id of the directory server
    pub fn id(self) -> &'static str {
        match self {
            DirectoryServer::Visa => "A000000003",
            DirectoryServer::Mastercard => "A000000004",
            DirectoryServer::Amex => "A000000025",
            DirectoryServer::Discover => "A000000152",
        }
    }

    /// Root certificate (PEM) of the directory server.
    ///
    /// The bundled files are self-issued development certificates, not the networks'
    /// published directory server roots; replace them before use against real issuers.
    pub fn certificate_pem(self) -> &'static str {
        match self {
            DirectoryServer::Visa => include_str!("../certs/ds-visa.pem"),
            DirectoryServer::Mastercard => include_str!("../certs/ds-mastercard.pem"),
            DirectoryServer::Amex => include_str!("../certs/ds-amex.pem"),
            DirectoryServer::Discover => include_str!("../certs/ds-discover.pem"),
        }
    }

    /// Key id the network requires alongside its certificate
    pub fn key_id(self) -> Option<&'static str> {
        match self {
            DirectoryServer::Visa => None,
            DirectoryServer::Mastercard => None,
            DirectoryServer::Amex => Some("7c4debe3f4af7f9d1569a2ffea4343c2566826ee"),
            DirectoryServer::Discover => None,
        }
    }

    /// Encryption metadata handed to a challenge runtime
    pub fn encryption(self) -> DirectoryServerEncryption {
        DirectoryServerEncryption {
            directory_server_id: self.id().to_string(),
            algorithm: ALGORITHM_RSA.to_string(),
            certificate_pem: self.certificate_pem().to_string(),
            key_id: self.key_id().map(str::to_string),
        }
    }
}

impl fmt::Display for DirectoryServer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Directory server trust material for one network
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryServerEncryption {
    pub directory_server_id: String,
    pub algorithm: String,
    pub certificate_pem: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key_id: Option<String>,
}

/// Look up the encryption metadata for a network name
pub fn lookup(network: &str) -> Option<DirectoryServerEncryption> {
    DirectoryServer::lookup(network).map(DirectoryServer::encryption)
}

fn normalize(network: &str) -> String {
    network
        .trim()
        .chars()
        .map(|c| match c {
            '-' | ' ' => '_',
            c => c.to_ascii_lowercase(),
        })
        .collect()
}
