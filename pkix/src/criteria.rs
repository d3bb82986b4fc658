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

//! Query criteria passed through the trust engine to the validation
//! information resolver.

use crate::pkix::TrustedNames;

/// Identifies the entity whose credential is being validated.
///
/// Resolvers treat the entity ID as an additional trusted name.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct EntityIdCriterion(String);

impl EntityIdCriterion {
    /// Create a criterion for the given entity ID.
    pub fn new(entity_id: impl Into<String>) -> Self {
        Self(entity_id.into())
    }

    /// Return the entity ID.
    pub fn entity_id(&self) -> &str {
        &self.0
    }
}

/// Supplies trusted names dynamically, at validation time.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct TrustedNamesCriterion(TrustedNames);

impl TrustedNamesCriterion {
    /// Create a criterion from a collection of names.
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(names.into_iter().map(Into::into).collect())
    }

    /// Return the trusted names.
    pub fn trusted_names(&self) -> &TrustedNames {
        &self.0
    }
}

/// The criteria for one validation request.
///
/// The set is opaque to the trust engine, which simply hands it to the
/// resolver.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct CriteriaSet {
    entity_id: Option<EntityIdCriterion>,
    trusted_names: Option<TrustedNamesCriterion>,
}

impl CriteriaSet {
    /// Create an empty criteria set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add (or replace) the entity ID criterion.
    pub fn with_entity_id(mut self, criterion: EntityIdCriterion) -> Self {
        self.entity_id = Some(criterion);
        self
    }

    /// Add (or replace) the trusted names criterion.
    pub fn with_trusted_names(mut self, criterion: TrustedNamesCriterion) -> Self {
        self.trusted_names = Some(criterion);
        self
    }

    /// Return the entity ID criterion, if present.
    pub fn entity_id(&self) -> Option<&EntityIdCriterion> {
        self.entity_id.as_ref()
    }

    /// Return the trusted names criterion, if present.
    pub fn trusted_names(&self) -> Option<&TrustedNamesCriterion> {
        self.trusted_names.as_ref()
    }

    /// Return `true` if no criteria are present.
    pub fn is_empty(&self) -> bool {
        self.entity_id.is_none() && self.trusted_names.is_none()
    }
}
