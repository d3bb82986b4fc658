// Copyright 2024 Adobe. All rights reserved.
// This file is licensed to you under the Apache License,
// Version 2.0 (http://www.apache.org/licenses/LICENSE-2.0)
// or the MIT license (http://opensource.org/licenses/MIT),
// at your option.

// Unless required by applicable law or agreed to in writing,
// this software is distributed on an "AS IS" BASIS, WITHOUT
// WARRANTIES OR REPRESENTATIONS OF ANY KIND, either express or
// implied. See the LICENSE-MIT and LICENSE-APACHE files for the
// specific language governing permissions and limitations under
// each license.

//! Loading PKIX trust configuration from JSON, JSON5, TOML or RON.
//!
//! Values not present in the supplied text keep their defaults, so a
//! configuration only needs to mention what it changes:
//!
//! ```
//! use pkix_trust::settings::PkixSettings;
//!
//! let settings = PkixSettings::from_string(
//!     r#"
//!     [validation]
//!     default_verification_depth = 3
//!     process_expired_crls = false
//!     "#,
//!     "toml",
//! )
//! .unwrap();
//!
//! assert_eq!(settings.validation.default_verification_depth(), 3);
//! assert!(!settings.validation.process_expired_crls());
//! assert!(settings.validation.process_empty_crls());
//! ```

use std::str::FromStr;

use asn1_rs::Oid;
use config::{Config, FileFormat};
use serde::{Deserialize, Serialize};

use crate::{
    pkix::{
        BasicX509CredentialNameEvaluator, PkixValidationInformation, PkixValidationOptions,
        StaticPkixValidationInformationResolver, TrustedNames,
    },
    x509_support::{decode_certificates, decode_crls, AltNameType},
    Error, Result,
};

// trait used to validate user input to make sure user supplied configurations are valid
pub(crate) trait SettingsValidate {
    // returns error if settings are invalid
    fn validate(&self) -> Result<()> {
        Ok(())
    }
}

impl SettingsValidate for PkixValidationOptions {
    fn validate(&self) -> Result<()> {
        for policy in self.initial_policies() {
            if Oid::from_str(policy).is_err() {
                return Err(Error::BadParam(format!(
                    "initial policy is not a valid OID: {policy}"
                )));
            }
        }
        Ok(())
    }
}

/// Settings for [`BasicX509CredentialNameEvaluator`].
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default)]
pub struct NameCheckSettings {
    /// Whether subject alternative names are matched against trusted names.
    ///
    /// The default value is true.
    pub check_subject_alt_names: bool,

    /// Whether the subject's most specific common name is matched against
    /// trusted names.
    ///
    /// The default value is true.
    pub check_subject_dn_common_name: bool,

    /// Whether the subject distinguished name is matched against trusted
    /// names.
    ///
    /// The default value is true.
    pub check_subject_dn: bool,

    /// The subject alternative name types to match.
    ///
    /// The default is `["dns", "uri"]`.
    pub subject_alt_name_types: Vec<AltNameType>,
}

impl Default for NameCheckSettings {
    fn default() -> Self {
        Self {
            check_subject_alt_names: true,
            check_subject_dn_common_name: true,
            check_subject_dn: true,
            subject_alt_name_types: vec![AltNameType::DnsName, AltNameType::Uri],
        }
    }
}

impl SettingsValidate for NameCheckSettings {}

/// Settings describing a single, static source of trust.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default)]
pub struct TrustSettings {
    /// Trust anchor certificates as a PEM bundle.
    pub trust_anchors: Option<String>,

    /// CRLs as a PEM bundle.
    pub crls: Option<String>,

    /// Maximum verification depth for these trust anchors. When absent,
    /// [`PkixValidationOptions::default_verification_depth`] applies.
    pub verification_depth: Option<i32>,

    /// Names a credential must match to be trusted.
    pub trusted_names: TrustedNames,

    /// Whether trusted names supplied at validation time are honored.
    ///
    /// The default value is false.
    pub support_dynamic_trusted_names: bool,
}

impl TrustSettings {
    fn anchors(&self) -> Result<Vec<Vec<u8>>> {
        decode_bundle(self.trust_anchors.as_deref(), "trust_anchors", decode_certificates)
    }

    fn crls(&self) -> Result<Vec<Vec<u8>>> {
        decode_bundle(self.crls.as_deref(), "crls", decode_crls)
    }
}

impl SettingsValidate for TrustSettings {
    fn validate(&self) -> Result<()> {
        // sanity check that the bundles can be decoded
        self.anchors()?;
        self.crls()?;
        Ok(())
    }
}

/// PKIX trust configuration.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default)]
pub struct PkixSettings {
    /// Path validation options.
    pub validation: PkixValidationOptions,

    /// Trusted name checking.
    pub name_checks: NameCheckSettings,

    /// A static source of trust anchors, CRLs and trusted names.
    pub trust: TrustSettings,
}

impl PkixSettings {
    /// Load settings from their string representation. `format` is one of
    /// `json`, `json5`, `toml` or `ron`.
    pub fn from_string(settings_str: &str, format: &str) -> Result<Self> {
        let f = match format.to_lowercase().as_str() {
            "json" => FileFormat::Json,
            "json5" => FileFormat::Json5,
            "toml" => FileFormat::Toml,
            "ron" => FileFormat::Ron,
            _ => {
                return Err(Error::BadParam(format!(
                    "unsupported settings format: {format}"
                )))
            }
        };

        let settings = Config::builder()
            .add_source(Config::try_from(&PkixSettings::default())?)
            .add_source(config::File::from_str(settings_str, f))
            .build()? // merge overrides, allows for partial changes
            .try_deserialize::<PkixSettings>()
            .map_err(|e| Error::BadParam(e.to_string()))?;

        settings.validate()?;

        Ok(settings)
    }

    /// Build the name evaluator described by [`name_checks`](Self::name_checks).
    pub fn name_evaluator(&self) -> BasicX509CredentialNameEvaluator {
        BasicX509CredentialNameEvaluator::builder()
            .check_subject_alt_names(self.name_checks.check_subject_alt_names)
            .check_subject_dn_common_name(self.name_checks.check_subject_dn_common_name)
            .check_subject_dn(self.name_checks.check_subject_dn)
            .subject_alt_name_types(self.name_checks.subject_alt_name_types.iter().copied())
            .build()
    }

    /// Build a resolver over the trust anchors, CRLs and trusted names
    /// described by [`trust`](Self::trust).
    pub fn resolver(&self) -> Result<StaticPkixValidationInformationResolver> {
        let info = PkixValidationInformation::new(
            self.trust.anchors()?,
            self.trust.crls()?,
            self.trust.verification_depth,
        );

        Ok(
            StaticPkixValidationInformationResolver::with_dynamic_trusted_names(
                vec![info],
                self.trust.trusted_names.clone(),
                self.trust.support_dynamic_trusted_names,
            ),
        )
    }
}

impl SettingsValidate for PkixSettings {
    fn validate(&self) -> Result<()> {
        self.validation.validate()?;
        self.name_checks.validate()?;
        self.trust.validate()
    }
}

// allow for JSON-encoded PEMs with \n
fn unescape_pem(pem: &str) -> Vec<u8> {
    pem.replace("\\n", "\n").into_bytes()
}

// A bundle that is present must yield at least one item; PEM blocks with
// other labels are otherwise skipped without complaint.
fn decode_bundle(
    bundle: Option<&str>,
    field: &str,
    decode: fn(&[u8]) -> Result<Vec<Vec<u8>>>,
) -> Result<Vec<Vec<u8>>> {
    let Some(pem) = bundle.filter(|pem| !pem.trim().is_empty()) else {
        return Ok(vec![]);
    };

    let ders =
        decode(&unescape_pem(pem)).map_err(|e| Error::BadParam(format!("{field}: {e}")))?;
    if ders.is_empty() {
        return Err(Error::BadParam(format!("{field}: no usable PEM blocks found")));
    }
    Ok(ders)
}
