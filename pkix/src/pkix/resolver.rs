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

use log::trace;

use super::{PkixValidationInformation, TrustedNames};
use crate::{CriteriaSet, Result};

/// Supplies the validation information and trusted names to use when
/// evaluating a credential.
///
/// Implementations report failures to produce their material as errors,
/// which abort the validation.
pub trait PkixValidationInformationResolver: Send + Sync {
    /// Return every set of validation information applicable to the criteria,
    /// in the order they should be tried.
    fn resolve(&self, criteria: &CriteriaSet) -> Result<Vec<PkixValidationInformation>>;

    /// Return the first set of validation information applicable to the
    /// criteria, if any.
    fn resolve_single(&self, criteria: &CriteriaSet) -> Result<Option<PkixValidationInformation>> {
        Ok(self.resolve(criteria)?.into_iter().next())
    }

    /// Return the names a credential must match to be trusted.
    fn resolve_trusted_names(&self, criteria: &CriteriaSet) -> Result<TrustedNames>;

    /// Return `true` if this resolver can produce trusted names.
    ///
    /// When this is `false`, trusted name checking is skipped entirely.
    fn supports_trusted_name_resolution(&self) -> bool;
}

/// A resolver that returns the same, preconfigured material on every call.
#[derive(Clone, Debug, Default)]
pub struct StaticPkixValidationInformationResolver {
    infos: Vec<PkixValidationInformation>,
    trusted_names: TrustedNames,
    support_dynamic_trusted_names: bool,
}

impl StaticPkixValidationInformationResolver {
    /// Create a resolver over fixed validation information and trusted names.
    ///
    /// Trusted names supplied at validation time through a
    /// [`TrustedNamesCriterion`](crate::TrustedNamesCriterion) are ignored.
    pub fn new(infos: Vec<PkixValidationInformation>, trusted_names: TrustedNames) -> Self {
        Self::with_dynamic_trusted_names(infos, trusted_names, false)
    }

    /// Create a resolver, choosing whether trusted names supplied at
    /// validation time are merged with the static ones.
    pub fn with_dynamic_trusted_names(
        infos: Vec<PkixValidationInformation>,
        trusted_names: TrustedNames,
        support_dynamic_trusted_names: bool,
    ) -> Self {
        Self {
            infos,
            trusted_names,
            support_dynamic_trusted_names,
        }
    }

    /// Return `true` if trusted names supplied at validation time are used.
    pub fn supports_dynamic_trusted_names(&self) -> bool {
        self.support_dynamic_trusted_names
    }
}

impl PkixValidationInformationResolver for StaticPkixValidationInformationResolver {
    fn resolve(&self, _criteria: &CriteriaSet) -> Result<Vec<PkixValidationInformation>> {
        Ok(self.infos.clone())
    }

    fn resolve_trusted_names(&self, criteria: &CriteriaSet) -> Result<TrustedNames> {
        let mut names = self.trusted_names.clone();

        if self.support_dynamic_trusted_names {
            if let Some(dynamic) = criteria.trusted_names() {
                trace!(
                    "adding {} dynamically supplied trusted names",
                    dynamic.trusted_names().len()
                );
                names.extend(dynamic.trusted_names().iter().cloned());
            }
        }

        if let Some(entity_id) = criteria.entity_id() {
            trace!("adding entity ID {} as a trusted name", entity_id.entity_id());
            names.insert(entity_id.entity_id().to_owned());
        }

        Ok(names)
    }

    fn supports_trusted_name_resolution(&self) -> bool {
        true
    }
}
