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

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Options that control how [`CertPathPkixTrustEvaluator`] builds and
/// validates certification paths.
///
/// Options are immutable once built. Use [`PkixValidationOptions::builder`]
/// to construct a customized set, or deserialize them from configuration
/// (see [`crate::settings`]). Fields that are absent from configuration take
/// their default values.
///
/// [`CertPathPkixTrustEvaluator`]: super::CertPathPkixTrustEvaluator
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default)]
pub struct PkixValidationOptions {
    default_verification_depth: i32,
    process_empty_crls: bool,
    process_expired_crls: bool,
    process_credential_crls: bool,
    force_revocation_enabled: bool,
    revocation_enabled: bool,
    policy_mapping_inhibited: bool,
    any_policy_inhibited: bool,
    initial_policies: BTreeSet<String>,
}

impl Default for PkixValidationOptions {
    fn default() -> Self {
        Self {
            default_verification_depth: 1,
            process_empty_crls: true,
            process_expired_crls: true,
            process_credential_crls: true,
            force_revocation_enabled: false,
            revocation_enabled: true,
            policy_mapping_inhibited: false,
            any_policy_inhibited: false,
            initial_policies: BTreeSet::new(),
        }
    }
}

impl PkixValidationOptions {
    /// Start building a set of options from the defaults.
    pub fn builder() -> PkixValidationOptionsBuilder {
        PkixValidationOptionsBuilder::default()
    }

    /// Maximum number of non-self-issued intermediate certificates allowed
    /// between the end entity and a trust anchor, used when the validation
    /// information doesn't specify a depth. Negative values mean no limit.
    pub fn default_verification_depth(&self) -> i32 {
        self.default_verification_depth
    }

    /// Whether CRLs with no revoked entries are used.
    pub fn process_empty_crls(&self) -> bool {
        self.process_empty_crls
    }

    /// Whether CRLs whose `nextUpdate` lies in the past are used.
    pub fn process_expired_crls(&self) -> bool {
        self.process_expired_crls
    }

    /// Whether CRLs carried by the untrusted credential are used.
    pub fn process_credential_crls(&self) -> bool {
        self.process_credential_crls
    }

    /// Whether the revocation checking decision is forced to
    /// [`revocation_enabled`](Self::revocation_enabled) rather than inferred
    /// from the presence of CRLs.
    pub fn force_revocation_enabled(&self) -> bool {
        self.force_revocation_enabled
    }

    /// The revocation checking setting used when it is forced.
    pub fn revocation_enabled(&self) -> bool {
        self.revocation_enabled
    }

    /// Whether policy mapping is inhibited.
    pub fn policy_mapping_inhibited(&self) -> bool {
        self.policy_mapping_inhibited
    }

    /// Whether the `anyPolicy` OID is inhibited.
    pub fn any_policy_inhibited(&self) -> bool {
        self.any_policy_inhibited
    }

    /// The acceptable initial policy OIDs. When non-empty, an explicit policy
    /// is required.
    pub fn initial_policies(&self) -> &BTreeSet<String> {
        &self.initial_policies
    }
}

/// Builds an immutable [`PkixValidationOptions`].
#[derive(Clone, Debug, Default)]
pub struct PkixValidationOptionsBuilder {
    options: PkixValidationOptions,
}

impl PkixValidationOptionsBuilder {
    /// Set the default verification depth. Negative values mean no limit.
    pub fn default_verification_depth(mut self, depth: i32) -> Self {
        self.options.default_verification_depth = depth;
        self
    }

    /// Set whether empty CRLs are used.
    pub fn process_empty_crls(mut self, process: bool) -> Self {
        self.options.process_empty_crls = process;
        self
    }

    /// Set whether expired CRLs are used.
    pub fn process_expired_crls(mut self, process: bool) -> Self {
        self.options.process_expired_crls = process;
        self
    }

    /// Set whether CRLs carried by the untrusted credential are used.
    pub fn process_credential_crls(mut self, process: bool) -> Self {
        self.options.process_credential_crls = process;
        self
    }

    /// Force revocation checking on or off, regardless of whether any CRLs
    /// are available.
    pub fn force_revocation(mut self, enabled: bool) -> Self {
        self.options.force_revocation_enabled = true;
        self.options.revocation_enabled = enabled;
        self
    }

    /// Set whether policy mapping is inhibited.
    pub fn policy_mapping_inhibited(mut self, inhibited: bool) -> Self {
        self.options.policy_mapping_inhibited = inhibited;
        self
    }

    /// Set whether the `anyPolicy` OID is inhibited.
    pub fn any_policy_inhibited(mut self, inhibited: bool) -> Self {
        self.options.any_policy_inhibited = inhibited;
        self
    }

    /// Set the acceptable initial policy OIDs.
    pub fn initial_policies<I, S>(mut self, policies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.options.initial_policies = policies.into_iter().map(Into::into).collect();
        self
    }

    /// Finish building.
    pub fn build(self) -> PkixValidationOptions {
        self.options
    }
}
