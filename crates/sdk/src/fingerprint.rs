//! 3DS2 fingerprint resolution.
//!
//! A `stripe_3ds2_fingerprint` next action names the card network by string. Before a
//! challenge runtime can be started, that name has to be resolved against the directory
//! server registry to obtain the server id and the certificate the runtime will trust.
//! Unknown networks are an error: there is no fallback certificate.

use tracing::{debug, warn};

use crate::{
    error::{AuthError, Result},
    types::{
        DirectoryServer, DirectoryServerEncryption, LooseUrl, SdkChallengeData,
        ThreeDS2FingerprintData,
    },
};

/// Everything a challenge runtime needs to start a 3DS2 transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThreeDS2Fingerprint {
    /// 3DS2 source created by the backend
    pub source_id: String,

    pub directory_server: DirectoryServer,

    /// Registered id of the directory server (e.g. `A000000003`)
    pub directory_server_id: String,

    pub server_transaction_id: String,

    pub directory_server_encryption: DirectoryServerEncryption,

    pub three_ds_method_url: Option<LooseUrl>,
}

impl TryFrom<&SdkChallengeData> for ThreeDS2Fingerprint {
    type Error = AuthError;

    fn try_from(sdk_data: &SdkChallengeData) -> Result<Self> {
        build_3ds2_fingerprint(sdk_data)
    }
}

/// Resolve 3DS2 fingerprint data into challenge parameters.
///
/// Fails with [`AuthError::UnsupportedChallengeVersion`] for 3DS1 data and with
/// [`AuthError::UnknownDirectoryServer`] when the network is not registered.
pub fn build_3ds2_fingerprint(sdk_data: &SdkChallengeData) -> Result<ThreeDS2Fingerprint> {
    match sdk_data {
        SdkChallengeData::ThreeDS2Fingerprint(data) => resolve(data),
        SdkChallengeData::ThreeDS1 { .. } => Err(AuthError::UnsupportedChallengeVersion(
            sdk_data.type_tag().to_string(),
        )),
    }
}

fn resolve(data: &ThreeDS2FingerprintData) -> Result<ThreeDS2Fingerprint> {
    let Some(directory_server) = DirectoryServer::lookup(&data.directory_server_name) else {
        warn!(
            directory_server_name = %data.directory_server_name,
            "No directory server registered for network"
        );
        return Err(AuthError::UnknownDirectoryServer(
            data.directory_server_name.clone(),
        ));
    };

    debug!(
        directory_server = %directory_server,
        directory_server_id = directory_server.id(),
        source_id = %data.source_id,
        "Resolved 3DS2 directory server"
    );

    Ok(ThreeDS2Fingerprint {
        source_id: data.source_id.clone(),
        directory_server,
        directory_server_id: directory_server.id().to_string(),
        server_transaction_id: data.server_transaction_id.clone(),
        directory_server_encryption: directory_server.encryption(),
        three_ds_method_url: data.three_ds_method_url.clone(),
    })
}
