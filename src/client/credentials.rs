use crate::config::{ConfigError, SinkConfig};
use aws_config::environment::credentials::EnvironmentVariableCredentialsProvider;
use aws_config::imds::credentials::ImdsCredentialsProvider;
use aws_config::{BehaviorVersion, Region, SdkConfig};
use aws_credential_types::Credentials;

/// How the sink obtains AWS credentials, keyed on the
/// `(accessKey, secretKey)` pair from the configuration document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialsMode {
    /// Both fields are `"default"`: platform default provider chain.
    DefaultChain,
    /// Both fields are `"iam"`: instance-profile credentials.
    InstanceProfile,
    /// Both fields are `"env"`: `AWS_ACCESS_KEY_ID` / `AWS_SECRET_ACCESS_KEY`.
    Environment,
    /// Anything else: the two fields are literal keys.
    Static {
        access_key: String,
        secret_key: String,
    },
}

const SENTINELS: [&str; 3] = ["default", "iam", "env"];

impl CredentialsMode {
    /// Mixing a sentinel with a literal key is a configuration error.
    pub fn from_pair(access_key: &str, secret_key: &str) -> Result<Self, ConfigError> {
        match (access_key, secret_key) {
            ("default", "default") => Ok(Self::DefaultChain),
            ("iam", "iam") => Ok(Self::InstanceProfile),
            ("env", "env") => Ok(Self::Environment),
            (access, secret) if SENTINELS.contains(&access) || SENTINELS.contains(&secret) => {
                Err(ConfigError::MixedCredentials)
            }
            (access, secret) => Ok(Self::Static {
                access_key: access.to_string(),
                secret_key: secret.to_string(),
            }),
        }
    }
}

/// Builds the SDK configuration shared by the stream and queue clients.
pub async fn load_sdk_config(config: &SinkConfig) -> Result<SdkConfig, ConfigError> {
    let mode = CredentialsMode::from_pair(&config.access_key, &config.secret_key)?;

    let mut loader =
        aws_config::defaults(BehaviorVersion::latest()).region(Region::new(config.region.clone()));
    loader = match mode {
        CredentialsMode::DefaultChain => loader,
        CredentialsMode::InstanceProfile => {
            loader.credentials_provider(ImdsCredentialsProvider::builder().build())
        }
        CredentialsMode::Environment => {
            loader.credentials_provider(EnvironmentVariableCredentialsProvider::new())
        }
        CredentialsMode::Static {
            access_key,
            secret_key,
        } => loader.credentials_provider(Credentials::new(
            access_key,
            secret_key,
            None,
            None,
            "foss-sink-static",
        )),
    };
    if let Some(endpoint) = &config.custom_endpoint {
        loader = loader.endpoint_url(endpoint);
    }

    Ok(loader.load().await)
}
