use std::collections::BTreeMap;

use widestring::U16CString;

use crate::error::{GatewayResult, RfcErrorInfo};
use crate::rfc::RfcConnectionParameter;

/// Well known destination configuration keys.
pub mod keys {
    pub const APP_SERVER_HOST: &str = "ASHOST";
    pub const APP_SERVER_SERVICE: &str = "ASSERV";
    pub const MESSAGE_SERVER_HOST: &str = "MSHOST";
    pub const MESSAGE_SERVER_SERVICE: &str = "MSSERV";
    pub const LOGON_GROUP: &str = "GROUP";
    pub const GATEWAY_HOST: &str = "GWHOST";
    pub const GATEWAY_SERVICE: &str = "GWSERV";
    pub const SYSTEM_NUMBER: &str = "SYSNR";
    pub const SYSTEM_ID: &str = "SYSID";
    pub const CLIENT: &str = "CLIENT";
    pub const USER: &str = "USER";
    pub const ALIAS_USER: &str = "ALIAS_USER";
    pub const PASSWORD: &str = "PASSWD";
    pub const LANGUAGE: &str = "LANG";
    pub const CODEPAGE: &str = "CODEPAGE";
    pub const X509_CERTIFICATE: &str = "X509CERT";
    pub const SSO2_TICKET: &str = "MYSAPSSO2";
    pub const SAP_ROUTER: &str = "SAPROUTER";
    pub const SNC_MODE: &str = "SNC_MODE";
    pub const SNC_MY_NAME: &str = "SNC_MYNAME";
    pub const SNC_PARTNER_NAME: &str = "SNC_PARTNERNAME";
    pub const SNC_LIBRARY: &str = "SNC_LIB";
    pub const SNC_QOP: &str = "SNC_QOP";
    pub const TRACE: &str = "TRACE";
    pub const NO_COMPRESSION: &str = "NO_COMPRESSION";

    /// Name under which the destination is registered.
    pub const NAME: &str = "NAME";
    pub const PEAK_CONNECTIONS_LIMIT: &str = "MAX_POOL_SIZE";
    pub const POOL_SIZE: &str = "POOL_SIZE";
    pub const IDLE_TIMEOUT: &str = "IDLE_TIMEOUT";
    pub const IDLE_CHECK_TIME: &str = "IDLE_CHECK_TIME";
    pub const MAX_POOL_WAIT_TIME: &str = "MAX_POOL_WAIT_TIME";

    /// Keys that configure the connector itself and are not logon parameters.
    pub const CONNECTOR_LOCAL: [&str; 6] = [
        NAME,
        PEAK_CONNECTIONS_LIMIT,
        POOL_SIZE,
        IDLE_TIMEOUT,
        IDLE_CHECK_TIME,
        MAX_POOL_WAIT_TIME,
    ];
}

/// Key,value configuration of one destination. Keys are stored upper case
/// since the backend treats them case insensitively.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DestinationConfig {
    parms: BTreeMap<String, String>,
}

impl DestinationConfig {
    pub fn new() -> DestinationConfig {
        DestinationConfig::default()
    }

    /// Builder style `insert`.
    pub fn with(mut self, key: &str, value: &str) -> DestinationConfig {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: &str, value: &str) {
        self.parms.insert(key.to_ascii_uppercase(), value.to_string());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.parms.get(&key.to_ascii_uppercase()).map(String::as_str)
    }

    /// The configured destination name, if any.
    pub fn name(&self) -> Option<&str> {
        self.get(keys::NAME).filter(|n| !n.is_empty())
    }

    pub fn len(&self) -> usize {
        self.parms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parms.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.parms.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// The entries that are passed to the backend at logon.
    pub fn logon_parameters(&self) -> impl Iterator<Item = (&str, &str)> {
        self.iter()
            .filter(|(k, _)| !keys::CONNECTOR_LOCAL.contains(k))
    }
}

impl<K: AsRef<str>, V: AsRef<str>> FromIterator<(K, V)> for DestinationConfig {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut config = DestinationConfig::new();
        for (k, v) in iter {
            config.insert(k.as_ref(), v.as_ref());
        }
        config
    }
}

/// Simple RFC connections require only a few parameters.
/// You can use this struct to supply them.
pub struct RfcConnectionParameters<'a> {
    pub ashost: &'a str,
    pub sysnr: &'a str,
    pub client: &'a str,
    pub user: &'a str,
    pub passwd: &'a str,
    pub lang: &'a str,
}

impl<'a> RfcConnectionParameters<'a> {
    /// Convert to a destination configuration registered as `name`.
    pub fn to_config(&self, name: &str) -> DestinationConfig {
        DestinationConfig::new()
            .with(keys::NAME, name)
            .with(keys::APP_SERVER_HOST, self.ashost)
            .with(keys::SYSTEM_NUMBER, self.sysnr)
            .with(keys::CLIENT, self.client)
            .with(keys::USER, self.user)
            .with(keys::PASSWORD, self.passwd)
            .with(keys::LANGUAGE, self.lang)
    }
}

/// Key,value pairs in the UTF-16 form the SAP RFC library expects.
pub struct RfcConnParmHelper {
    parms: Vec<(Vec<u16>, Vec<u16>)>,
}

impl RfcConnParmHelper {
    /// Create an empty new structure
    pub fn new() -> RfcConnParmHelper {
        RfcConnParmHelper { parms: Vec::new() }
    }

    /// Logon parameters of `config`.
    pub fn from_config(config: &DestinationConfig) -> GatewayResult<RfcConnParmHelper> {
        let mut parms = RfcConnParmHelper::new();
        for (k, v) in config.logon_parameters() {
            parms.add(k, v)?;
        }
        Ok(parms)
    }

    /// Add a key,value pair
    pub fn add(&mut self, k: &str, v: &str) -> GatewayResult<()> {
        let k_c = U16CString::from_str(k)
            .map_err(|e| RfcErrorInfo::custom(&format!("invalid key '{}': {}", k, e)))?
            .into_vec_with_nul();
        let v_c = U16CString::from_str(v)
            .map_err(|e| RfcErrorInfo::custom(&format!("invalid value for '{}': {}", k, e)))?
            .into_vec_with_nul();
        self.parms.push((k_c, v_c));
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.parms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parms.is_empty()
    }

    pub fn as_vec<F, T>(&self, mut f: F) -> T
    where
        F: FnMut(Vec<RfcConnectionParameter>) -> T,
    {
        let pp = self
            .parms
            .iter()
            .map(|(k, v)| RfcConnectionParameter {
                name: k.as_ptr(),
                value: v.as_ptr(),
            })
            .collect();
        f(pp)
    }
}

impl Default for RfcConnParmHelper {
    fn default() -> Self {
        RfcConnParmHelper::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_are_case_insensitive() {
        let config = DestinationConfig::new()
            .with("name", "DEV")
            .with("AsHost", "192.168.8.4");
        assert_eq!(config.name(), Some("DEV"));
        assert_eq!(config.get("ASHOST"), Some("192.168.8.4"));
        assert_eq!(config.get("ashost"), Some("192.168.8.4"));
    }

    #[test]
    fn connector_keys_are_not_logon_parameters() {
        let config: DestinationConfig = vec![
            ("NAME", "DEV"),
            ("ASHOST", "192.168.8.4"),
            ("MAX_POOL_SIZE", "10"),
            ("CLIENT", "001"),
        ]
        .into_iter()
        .collect();
        let logon: Vec<&str> = config.logon_parameters().map(|(k, _)| k).collect();
        assert_eq!(logon, vec!["ASHOST", "CLIENT"]);
        assert_eq!(RfcConnParmHelper::from_config(&config).map(|p| p.len()), Ok(2));
    }

    #[test]
    fn simple_parameters_convert_to_a_named_config() {
        let parms = RfcConnectionParameters {
            ashost: "192.168.8.4",
            sysnr: "00",
            client: "001",
            user: "bobpage",
            passwd: "secret",
            lang: "EN",
        };
        let config = parms.to_config("DEV");
        assert_eq!(config.name(), Some("DEV"));
        assert_eq!(config.get(keys::SYSTEM_NUMBER), Some("00"));
        assert_eq!(config.len(), 7);
    }

    #[test]
    fn helper_rejects_interior_nul() {
        let mut helper = RfcConnParmHelper::new();
        assert!(helper.add("USER", "bob\0page").is_err());
        assert!(helper.is_empty());
    }
}
