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

use crate::pkix::PkixValidationOptions;

#[test]
fn defaults() {
    let options = PkixValidationOptions::default();

    assert_eq!(options.default_verification_depth(), 1);
    assert!(options.process_empty_crls());
    assert!(options.process_expired_crls());
    assert!(options.process_credential_crls());
    assert!(!options.force_revocation_enabled());
    assert!(options.revocation_enabled());
    assert!(!options.policy_mapping_inhibited());
    assert!(!options.any_policy_inhibited());
    assert!(options.initial_policies().is_empty());

    assert_eq!(PkixValidationOptions::builder().build(), options);
}

#[test]
fn builder() {
    let options = PkixValidationOptions::builder()
        .default_verification_depth(-1)
        .process_empty_crls(false)
        .process_expired_crls(false)
        .process_credential_crls(false)
        .force_revocation(false)
        .policy_mapping_inhibited(true)
        .any_policy_inhibited(true)
        .initial_policies(["1.2.3.4", "1.2.3.5", "1.2.3.4"])
        .build();

    assert_eq!(options.default_verification_depth(), -1);
    assert!(!options.process_empty_crls());
    assert!(!options.process_expired_crls());
    assert!(!options.process_credential_crls());
    assert!(options.force_revocation_enabled());
    assert!(!options.revocation_enabled());
    assert!(options.policy_mapping_inhibited());
    assert!(options.any_policy_inhibited());
    assert_eq!(options.initial_policies().len(), 2);
}
