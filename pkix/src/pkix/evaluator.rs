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

use log::{debug, error, log_enabled, trace, Level};

use super::{
    cert_store::{CertStore, PathCertificate},
    path_builder::{build_path, BuildOutcome, BuiltPath, PathParameters},
    policy::PolicyParameters,
    PkixValidationInformation, PkixValidationOptions,
};
use crate::{
    x500::{InternalX500DnHandler, X500DnHandler},
    x509_support::{identifiers_token, sha256_fingerprint},
    Error, Result, X509Credential,
};

/// The outcome of an attempt to build a certification path.
#[derive(Debug, Eq, PartialEq)]
pub enum PathResult {
    /// A valid path to one of the trust anchors was built.
    Found,

    /// No valid path could be built. This is an ordinary negative result.
    NotFound,

    /// Path building could not be carried out.
    Fatal(Error),
}

impl PathResult {
    /// Convert to the boolean-or-error form used by [`PkixTrustEvaluator`].
    pub fn into_result(self) -> Result<bool> {
        match self {
            Self::Found => Ok(true),
            Self::NotFound => Ok(false),
            Self::Fatal(err) => Err(err),
        }
    }
}

/// Evaluates an untrusted credential against one set of validation
/// information.
pub trait PkixTrustEvaluator: Send + Sync {
    /// Return `Ok(true)` if a valid certification path from the credential to
    /// one of the trust anchors in `info` can be built, `Ok(false)` if not.
    ///
    /// An error means the evaluation itself could not be performed, for
    /// example because `info` contains no trust anchors.
    fn validate(
        &self,
        info: &PkixValidationInformation,
        credential: &X509Credential,
    ) -> Result<bool>;

    /// Return the options that govern path validation.
    fn pkix_validation_options(&self) -> &PkixValidationOptions;

    /// Return the handler used to format names in log messages.
    fn x500_dn_handler(&self) -> &dyn X500DnHandler;
}

/// A [`PkixTrustEvaluator`] that builds and validates certification paths
/// following RFC 5280.
///
/// Revocation checking is enabled whenever at least one CRL is available,
/// unless [`PkixValidationOptions::force_revocation_enabled`] is set.
#[derive(Clone, Debug)]
pub struct CertPathPkixTrustEvaluator {
    options: PkixValidationOptions,
    x500_dn_handler: Arc<dyn X500DnHandler>,
}

impl Default for CertPathPkixTrustEvaluator {
    fn default() -> Self {
        Self::with_options(PkixValidationOptions::default())
    }
}

impl CertPathPkixTrustEvaluator {
    /// Create an evaluator with default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an evaluator with the given options.
    pub fn with_options(options: PkixValidationOptions) -> Self {
        Self {
            options,
            x500_dn_handler: Arc::new(InternalX500DnHandler),
        }
    }

    /// Replace the handler used to format names in log messages.
    pub fn with_x500_dn_handler(mut self, handler: Arc<dyn X500DnHandler>) -> Self {
        self.x500_dn_handler = handler;
        self
    }

    /// Attempt to build a certification path, distinguishing "no path" from
    /// failures that prevented the attempt.
    pub fn build_path(
        &self,
        info: &PkixValidationInformation,
        credential: &X509Credential,
    ) -> PathResult {
        let token = identifiers_token(credential, self.x500_dn_handler.as_ref());
        debug!("attempting PKIX path validation on untrusted credential: {token}");

        match self.try_build_path(info, credential, &token) {
            Ok(true) => PathResult::Found,
            Ok(false) => PathResult::NotFound,
            Err(err) => {
                error!("PKIX validation failure for untrusted credential: {token}: {err}");
                PathResult::Fatal(err)
            }
        }
    }

    fn try_build_path(
        &self,
        info: &PkixValidationInformation,
        credential: &X509Credential,
        token: &str,
    ) -> Result<bool> {
        if info.certificates().is_empty() {
            return Err(Error::NoTrustAnchors);
        }

        trace!("constructing trust anchors for PKIX validation");
        let anchors = info
            .certificates()
            .iter()
            .map(|der| PathCertificate::parse(der))
            .collect::<Result<Vec<_>>>()?;
        if log_enabled!(Level::Trace) {
            for anchor in &anchors {
                trace!("trust anchor: {}", self.describe(anchor));
            }
        }

        let target = PathCertificate::parse(credential.entity_certificate())?;

        let now = chrono::Utc::now().timestamp();
        let store = CertStore::build(
            info,
            credential,
            &self.options,
            self.x500_dn_handler.as_ref(),
            now,
        )?;

        let params = self.path_parameters(info, &store, now);
        match build_path(&target, &anchors, &store.certificates, &store.crls, &params)? {
            BuildOutcome::Built(path) => {
                if log_enabled!(Level::Debug) {
                    self.log_path(&path, &target);
                }
                Ok(true)
            }
            BuildOutcome::NotBuilt(reason) => {
                if log_enabled!(Level::Trace) {
                    trace!("PKIX path construction failed for untrusted credential: {token}: {reason}");
                } else {
                    error!("PKIX path construction failed for untrusted credential: {token}");
                }
                Ok(false)
            }
        }
    }

    fn path_parameters(
        &self,
        info: &PkixValidationInformation,
        store: &CertStore,
        now: i64,
    ) -> PathParameters {
        let max_path_length = info
            .verification_depth()
            .unwrap_or_else(|| self.options.default_verification_depth());
        trace!("setting max verification depth to: {max_path_length}");

        let revocation_enabled = if self.options.force_revocation_enabled() {
            trace!(
                "revocation checking is being forced to: {}",
                self.options.revocation_enabled()
            );
            self.options.revocation_enabled()
        } else if store.contains_crls() {
            trace!("at least one CRL was present in cert store, enabling revocation checking");
            true
        } else {
            trace!("no CRLs present in cert store, disabling revocation checking");
            false
        };

        let initial_policies = self.options.initial_policies().clone();
        if !initial_policies.is_empty() {
            debug!("initial policies are being set to: {initial_policies:?}");
        }

        PathParameters {
            max_path_length,
            revocation_enabled,
            policy: PolicyParameters {
                explicit_policy_required: !initial_policies.is_empty(),
                initial_policies,
                policy_mapping_inhibited: self.options.policy_mapping_inhibited(),
                any_policy_inhibited: self.options.any_policy_inhibited(),
            },
            now,
        }
    }

    fn log_path(&self, path: &BuiltPath, target: &PathCertificate) {
        debug!("built valid PKIX cert path");
        debug!("target certificate: {}", self.describe(target));
        for cert in &path.certificates {
            debug!("cert path certificate: {}", self.describe(cert));
        }
        debug!("trust anchor: {}", self.describe(path.anchor));
    }

    fn describe(&self, cert: &PathCertificate) -> String {
        format!(
            "{} (sha256 {})",
            self.x500_dn_handler.name(&cert.subject),
            sha256_fingerprint(cert.der)
        )
    }
}

impl PkixTrustEvaluator for CertPathPkixTrustEvaluator {
    fn validate(
        &self,
        info: &PkixValidationInformation,
        credential: &X509Credential,
    ) -> Result<bool> {
        self.build_path(info, credential).into_result()
    }

    fn pkix_validation_options(&self) -> &PkixValidationOptions {
        &self.options
    }

    fn x500_dn_handler(&self) -> &dyn X500DnHandler {
        self.x500_dn_handler.as_ref()
    }
}
