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

/// One set of trust material against which a credential can be validated:
/// trust anchors, supplementary CRLs, and an optional maximum path depth.
///
/// Certificates and CRLs are held in DER format. They are decoded when the
/// information is evaluated, so malformed material only invalidates this
/// particular set.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct PkixValidationInformation {
    certificates: Vec<Vec<u8>>,
    crls: Vec<Vec<u8>>,
    verification_depth: Option<i32>,
}

impl PkixValidationInformation {
    /// Create validation information from trust anchor certificates, CRLs,
    /// and an optional verification depth.
    pub fn new(
        certificates: Vec<Vec<u8>>,
        crls: Vec<Vec<u8>>,
        verification_depth: Option<i32>,
    ) -> Self {
        Self {
            certificates,
            crls,
            verification_depth,
        }
    }

    /// Return the trust anchor certificates.
    pub fn certificates(&self) -> &[Vec<u8>] {
        &self.certificates
    }

    /// Return the CRLs used to supplement path validation.
    pub fn crls(&self) -> &[Vec<u8>] {
        &self.crls
    }

    /// Return the maximum verification depth, if one was specified.
    pub fn verification_depth(&self) -> Option<i32> {
        self.verification_depth
    }
}
