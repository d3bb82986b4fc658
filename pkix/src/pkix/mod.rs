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

//! PKIX trust evaluation.
//!
//! [`PkixX509CredentialTrustEngine`] ties together three collaborators:
//!
//! * a [`PkixValidationInformationResolver`], which supplies trusted names
//!   and one or more sets of [`PkixValidationInformation`];
//! * an optional [`X509CredentialNameEvaluator`], which checks the
//!   credential's names against the trusted names;
//! * a [`PkixTrustEvaluator`], which attempts to build a certification path
//!   from the credential to one of the trust anchors in a set of validation
//!   information.

use std::collections::BTreeSet;

mod cert_store;

mod engine;
pub use engine::PkixX509CredentialTrustEngine;

mod evaluator;
pub use evaluator::{CertPathPkixTrustEvaluator, PathResult, PkixTrustEvaluator};

pub(crate) mod name_constraints;

mod name_evaluator;
pub use name_evaluator::{
    BasicX509CredentialNameEvaluator, BasicX509CredentialNameEvaluatorBuilder,
    PassThroughNameEvaluator, X509CredentialNameEvaluator,
};

mod options;
pub use options::{PkixValidationOptions, PkixValidationOptionsBuilder};

mod path_builder;
mod policy;

mod resolver;
pub use resolver::{PkixValidationInformationResolver, StaticPkixValidationInformationResolver};

mod revocation;

mod validation_info;
pub use validation_info::PkixValidationInformation;

/// A set of names, any one of which a credential may match to be trusted.
///
/// Names are compared case-sensitively, except where they are interpreted as
/// distinguished names.
pub type TrustedNames = BTreeSet<String>;
