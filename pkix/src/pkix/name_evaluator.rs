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

use std::sync::Arc;

use log::{debug, info};
use x509_parser::certificate::X509Certificate;

use super::TrustedNames;
use crate::{
    x500::{DistinguishedName, InternalX500DnHandler, X500DnHandler},
    x509_support::{alt_names, common_names, identifiers_token, AltNameType},
    Result, X509Credential,
};

/// Checks a credential's names against a set of trusted names.
pub trait X509CredentialNameEvaluator: Send + Sync {
    /// Return `true` if the credential satisfies the trusted names.
    ///
    /// An error is returned only when the credential's certificate can't be
    /// processed. A name mismatch is reported as `Ok(false)`.
    fn evaluate(
        &self,
        credential: &X509Credential,
        trusted_names: Option<&TrustedNames>,
    ) -> Result<bool>;
}

/// A name evaluator that accepts every credential.
#[derive(Clone, Copy, Debug, Default)]
pub struct PassThroughNameEvaluator;

impl X509CredentialNameEvaluator for PassThroughNameEvaluator {
    fn evaluate(
        &self,
        _credential: &X509Credential,
        _trusted_names: Option<&TrustedNames>,
    ) -> Result<bool> {
        Ok(true)
    }
}

/// The standard name evaluator.
///
/// The enabled checks run in a fixed order and the first match wins:
///
/// 1. subject alternative names of the configured types, compared exactly;
/// 2. the most specific common name of the subject, compared exactly;
/// 3. the subject distinguished name, compared structurally against every
///    trusted name that parses as a distinguished name.
///
/// With no checks enabled every credential passes. Otherwise an empty or
/// missing set of trusted names fails.
#[derive(Clone, Debug)]
pub struct BasicX509CredentialNameEvaluator {
    check_subject_alt_names: bool,
    check_subject_dn_common_name: bool,
    check_subject_dn: bool,
    subject_alt_name_types: Vec<AltNameType>,
    x500_dn_handler: Arc<dyn X500DnHandler>,
}

impl Default for BasicX509CredentialNameEvaluator {
    fn default() -> Self {
        Self {
            check_subject_alt_names: true,
            check_subject_dn_common_name: true,
            check_subject_dn: true,
            subject_alt_name_types: vec![AltNameType::DnsName, AltNameType::Uri],
            x500_dn_handler: Arc::new(InternalX500DnHandler),
        }
    }
}

impl BasicX509CredentialNameEvaluator {
    /// Create an evaluator with every check enabled, matching DNS and URI
    /// subject alternative names.
    pub fn new() -> Self {
        Self::default()
    }

    /// Start building a customized evaluator from the defaults.
    pub fn builder() -> BasicX509CredentialNameEvaluatorBuilder {
        BasicX509CredentialNameEvaluatorBuilder::default()
    }

    /// Return `true` if at least one check is enabled.
    pub fn is_name_checking_active(&self) -> bool {
        self.check_subject_alt_names || self.check_subject_dn_common_name || self.check_subject_dn
    }

    /// Whether subject alternative names are checked.
    pub fn check_subject_alt_names(&self) -> bool {
        self.check_subject_alt_names
    }

    /// Whether the subject's common name is checked.
    pub fn check_subject_dn_common_name(&self) -> bool {
        self.check_subject_dn_common_name
    }

    /// Whether the subject distinguished name is checked.
    pub fn check_subject_dn(&self) -> bool {
        self.check_subject_dn
    }

    /// The subject alternative name types that are checked.
    pub fn subject_alt_name_types(&self) -> &[AltNameType] {
        &self.subject_alt_name_types
    }

    /// The handler used to parse and format distinguished names.
    pub fn x500_dn_handler(&self) -> &dyn X500DnHandler {
        self.x500_dn_handler.as_ref()
    }

    fn process_subject_alt_names(
        &self,
        cert: &X509Certificate,
        trusted_names: &TrustedNames,
    ) -> Result<bool> {
        debug!("processing subject alt names");
        let names = alt_names(cert, &self.subject_alt_name_types)?;
        debug!("extracted subject alt names from certificate: {names:?}");

        match names.iter().find(|name| trusted_names.contains(*name)) {
            Some(name) => {
                debug!("matched subject alt name to trusted names: {name}");
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn process_subject_dn_common_name(
        &self,
        cert: &X509Certificate,
        trusted_names: &TrustedNames,
    ) -> bool {
        debug!("processing subject DN common name");

        // Only the most specific CN is compared.
        let Some(common_name) = common_names(cert).into_iter().next() else {
            return false;
        };
        debug!("extracted common name from certificate: {common_name}");

        if !common_name.is_empty() && trusted_names.contains(&common_name) {
            debug!("matched subject DN common name to trusted names: {common_name}");
            return true;
        }
        false
    }

    fn process_subject_dn(&self, cert: &X509Certificate, trusted_names: &TrustedNames) -> bool {
        debug!("processing subject DN");
        let subject = DistinguishedName::from_x509_name(cert.subject());
        debug!(
            "extracted subject DN from certificate: {}",
            self.x500_dn_handler.name(&subject)
        );

        for trusted_name in trusted_names {
            match self.x500_dn_handler.parse(trusted_name) {
                Ok(trusted_dn) => {
                    debug!("evaluating DN parsed from trusted name: {trusted_name}");
                    if trusted_dn == subject {
                        debug!(
                            "matched subject DN to trusted names: {}",
                            self.x500_dn_handler.name(&subject)
                        );
                        return true;
                    }
                }
                Err(_) => {
                    debug!("trusted name was not a DN or could not be parsed: {trusted_name}");
                }
            }
        }
        false
    }
}

impl X509CredentialNameEvaluator for BasicX509CredentialNameEvaluator {
    fn evaluate(
        &self,
        credential: &X509Credential,
        trusted_names: Option<&TrustedNames>,
    ) -> Result<bool> {
        if !self.is_name_checking_active() {
            debug!("no trusted name options are active, skipping name evaluation");
            return Ok(true);
        }

        let Some(trusted_names) = trusted_names.filter(|names| !names.is_empty()) else {
            debug!("supplied trusted names are missing or empty, failing name evaluation");
            return Ok(false);
        };

        let token = identifiers_token(credential, self.x500_dn_handler.as_ref());
        debug!("checking trusted names against credential: {token}");
        debug!("trusted names being evaluated are: {trusted_names:?}");

        let cert = credential.parsed_entity_certificate()?;

        if self.check_subject_alt_names && self.process_subject_alt_names(&cert, trusted_names)? {
            debug!("credential {token} passed name check based on subject alt names");
            return Ok(true);
        }

        if self.check_subject_dn_common_name
            && self.process_subject_dn_common_name(&cert, trusted_names)
        {
            debug!("credential {token} passed name check based on subject common name");
            return Ok(true);
        }

        if self.check_subject_dn && self.process_subject_dn(&cert, trusted_names) {
            debug!("credential {token} passed name check based on subject DN");
            return Ok(true);
        }

        info!("credential failed name check: {token}");
        Ok(false)
    }
}

/// Builds a [`BasicX509CredentialNameEvaluator`].
#[derive(Clone, Debug, Default)]
pub struct BasicX509CredentialNameEvaluatorBuilder {
    evaluator: BasicX509CredentialNameEvaluator,
}

impl BasicX509CredentialNameEvaluatorBuilder {
    /// Enable or disable the subject alternative name check.
    pub fn check_subject_alt_names(mut self, check: bool) -> Self {
        self.evaluator.check_subject_alt_names = check;
        self
    }

    /// Enable or disable the subject common name check.
    pub fn check_subject_dn_common_name(mut self, check: bool) -> Self {
        self.evaluator.check_subject_dn_common_name = check;
        self
    }

    /// Enable or disable the subject distinguished name check.
    pub fn check_subject_dn(mut self, check: bool) -> Self {
        self.evaluator.check_subject_dn = check;
        self
    }

    /// Set the subject alternative name types to check.
    pub fn subject_alt_name_types(mut self, types: impl IntoIterator<Item = AltNameType>) -> Self {
        let mut types: Vec<AltNameType> = types.into_iter().collect();
        types.sort();
        types.dedup();
        self.evaluator.subject_alt_name_types = types;
        self
    }

    /// Use a custom distinguished name handler.
    pub fn x500_dn_handler(mut self, handler: Arc<dyn X500DnHandler>) -> Self {
        self.evaluator.x500_dn_handler = handler;
        self
    }

    /// Finish building.
    pub fn build(self) -> BasicX509CredentialNameEvaluator {
        self.evaluator
    }
}
