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

use log::{debug, trace};

use super::{
    BasicX509CredentialNameEvaluator, CertPathPkixTrustEvaluator, PkixTrustEvaluator,
    PkixValidationInformationResolver, TrustedNames, X509CredentialNameEvaluator,
};
use crate::{CriteriaSet, Error, Result, X509Credential};

/// Decides whether an untrusted X.509 credential is trusted.
///
/// The credential must first pass the trusted name check (when one applies).
/// Each set of validation information supplied by the resolver is then tried
/// in order until one of them yields a valid certification path.
pub struct PkixX509CredentialTrustEngine {
    resolver: Box<dyn PkixValidationInformationResolver>,
    pkix_evaluator: Box<dyn PkixTrustEvaluator>,
    name_evaluator: Option<Box<dyn X509CredentialNameEvaluator>>,
}

impl PkixX509CredentialTrustEngine {
    /// Create an engine using a [`CertPathPkixTrustEvaluator`] and a
    /// [`BasicX509CredentialNameEvaluator`] with their default settings.
    pub fn new(resolver: Box<dyn PkixValidationInformationResolver>) -> Self {
        Self::with_name_evaluator(
            resolver,
            Some(Box::new(BasicX509CredentialNameEvaluator::new())),
        )
    }

    /// Create an engine using a default [`CertPathPkixTrustEvaluator`].
    ///
    /// Passing `None` for `name_evaluator` disables trusted name checking.
    pub fn with_name_evaluator(
        resolver: Box<dyn PkixValidationInformationResolver>,
        name_evaluator: Option<Box<dyn X509CredentialNameEvaluator>>,
    ) -> Self {
        Self::with_evaluators(
            resolver,
            Box::new(CertPathPkixTrustEvaluator::new()),
            name_evaluator,
        )
    }

    /// Create an engine from explicit collaborators.
    pub fn with_evaluators(
        resolver: Box<dyn PkixValidationInformationResolver>,
        pkix_evaluator: Box<dyn PkixTrustEvaluator>,
        name_evaluator: Option<Box<dyn X509CredentialNameEvaluator>>,
    ) -> Self {
        Self {
            resolver,
            pkix_evaluator,
            name_evaluator,
        }
    }

    /// The resolver supplying validation information and trusted names.
    pub fn resolver(&self) -> &dyn PkixValidationInformationResolver {
        self.resolver.as_ref()
    }

    /// The evaluator used to build certification paths.
    pub fn pkix_trust_evaluator(&self) -> &dyn PkixTrustEvaluator {
        self.pkix_evaluator.as_ref()
    }

    /// The evaluator used to check trusted names, if any.
    pub fn name_evaluator(&self) -> Option<&dyn X509CredentialNameEvaluator> {
        self.name_evaluator.as_deref()
    }

    /// Return `Ok(true)` if the credential is trusted under the criteria.
    ///
    /// Errors from the resolver abort validation. An error from one set of
    /// validation information is logged and that set skipped if
    /// [`Error::is_recoverable`] holds for it; any other error aborts
    /// validation.
    pub fn validate(&self, credential: &X509Credential, criteria: &CriteriaSet) -> Result<bool> {
        debug!("beginning PKIX validation using trusted validation information");

        let trusted_names = self.resolve_trusted_names(criteria)?;

        if !self.check_names(credential, trusted_names.as_ref())? {
            debug!("evaluation of credential against trusted names failed, aborting PKIX validation");
            return Ok(false);
        }

        let infos = self.resolver.resolve(criteria).map_err(resolution_failed)?;
        trace!("resolved {} sets of PKIX validation information", infos.len());

        for info in &infos {
            match self.pkix_evaluator.validate(info, credential) {
                Ok(true) => {
                    debug!("credential trust established via PKIX validation");
                    return Ok(true);
                }
                Ok(false) => {}
                Err(err) if err.is_recoverable() => {
                    debug!("error performing PKIX validation on untrusted credential: {err}");
                }
                Err(err) => return Err(err),
            }
        }

        debug!("trust of untrusted credential could not be established via PKIX validation");
        Ok(false)
    }

    /// Returns `None` when the resolver can't produce trusted names, in which
    /// case name checking doesn't apply.
    fn resolve_trusted_names(&self, criteria: &CriteriaSet) -> Result<Option<TrustedNames>> {
        if !self.resolver.supports_trusted_name_resolution() {
            debug!("PKIX resolver does not support resolution of trusted names, skipping name checking");
            return Ok(None);
        }

        self.resolver
            .resolve_trusted_names(criteria)
            .map(Some)
            .map_err(resolution_failed)
    }

    fn check_names(
        &self,
        credential: &X509Credential,
        trusted_names: Option<&TrustedNames>,
    ) -> Result<bool> {
        let Some(name_evaluator) = &self.name_evaluator else {
            debug!("no credential name evaluator was available, skipping trusted name evaluation");
            return Ok(true);
        };

        let Some(trusted_names) = trusted_names else {
            debug!("trusted names are not applicable, skipping trusted name evaluation");
            return Ok(true);
        };

        name_evaluator.evaluate(credential, Some(trusted_names))
    }
}

impl std::fmt::Debug for PkixX509CredentialTrustEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PkixX509CredentialTrustEngine")
            .field("name_checking", &self.name_evaluator.is_some())
            .finish_non_exhaustive()
    }
}

fn resolution_failed(err: Error) -> Error {
    match err {
        Error::ResolutionFailed(_) => err,
        other => Error::ResolutionFailed(other.to_string()),
    }
}
