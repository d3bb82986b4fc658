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

use crate::{
    pkix::{
        BasicX509CredentialNameEvaluator, PassThroughNameEvaluator, TrustedNames,
        X509CredentialNameEvaluator,
    },
    tests::test_utils::{credential, FOO_1A1_GOOD, FOO_MULTI_CN},
    x509_support::AltNameType,
};

fn names(names: &[&str]) -> TrustedNames {
    names.iter().map(|n| n.to_string()).collect()
}

fn only(check_alt_names: bool, check_cn: bool, check_dn: bool) -> BasicX509CredentialNameEvaluator {
    BasicX509CredentialNameEvaluator::builder()
        .check_subject_alt_names(check_alt_names)
        .check_subject_dn_common_name(check_cn)
        .check_subject_dn(check_dn)
        .build()
}

#[test]
fn defaults() {
    let evaluator = BasicX509CredentialNameEvaluator::new();

    assert!(evaluator.is_name_checking_active());
    assert!(evaluator.check_subject_alt_names());
    assert!(evaluator.check_subject_dn_common_name());
    assert!(evaluator.check_subject_dn());
    assert_eq!(
        evaluator.subject_alt_name_types(),
        &[AltNameType::DnsName, AltNameType::Uri]
    );

    let _ = format!("{evaluator:#?}");
}

#[test]
fn builder_sorts_and_dedups_alt_name_types() {
    let evaluator = BasicX509CredentialNameEvaluator::builder()
        .subject_alt_name_types([
            AltNameType::Uri,
            AltNameType::Rfc822Name,
            AltNameType::Uri,
        ])
        .build();

    assert_eq!(
        evaluator.subject_alt_name_types(),
        &[AltNameType::Rfc822Name, AltNameType::Uri]
    );
}

#[test]
fn all_checks_disabled() {
    let evaluator = only(false, false, false);
    assert!(!evaluator.is_name_checking_active());

    let cred = credential(FOO_1A1_GOOD);
    assert!(evaluator.evaluate(&cred, None).unwrap());
    assert!(evaluator.evaluate(&cred, Some(&names(&[]))).unwrap());
    assert!(evaluator
        .evaluate(&cred, Some(&names(&["no.such.name"])))
        .unwrap());
}

#[test]
fn missing_or_empty_trusted_names() {
    let cred = credential(FOO_1A1_GOOD);

    for evaluator in [only(true, false, false), only(false, true, false), only(false, false, true)] {
        assert!(!evaluator.evaluate(&cred, None).unwrap());
        assert!(!evaluator.evaluate(&cred, Some(&names(&[]))).unwrap());
    }
}

#[test]
fn subject_alt_names() {
    let evaluator = only(true, false, false);
    let cred = credential(FOO_1A1_GOOD);

    assert!(evaluator
        .evaluate(&cred, Some(&names(&["foo.example.org"])))
        .unwrap());
    assert!(evaluator
        .evaluate(&cred, Some(&names(&["https://foo.example.org/sp"])))
        .unwrap());
    assert!(!evaluator
        .evaluate(&cred, Some(&names(&["FOO.EXAMPLE.ORG", "bar.example.org"])))
        .unwrap());
}

#[test]
fn subject_alt_name_types_limit_matching() {
    let cred = credential(FOO_MULTI_CN);
    let trusted = names(&["foo@example.org"]);

    assert!(!only(true, false, false)
        .evaluate(&cred, Some(&trusted))
        .unwrap());

    let evaluator = BasicX509CredentialNameEvaluator::builder()
        .check_subject_dn_common_name(false)
        .check_subject_dn(false)
        .subject_alt_name_types([AltNameType::Rfc822Name])
        .build();
    assert!(evaluator.evaluate(&cred, Some(&trusted)).unwrap());

    let dns_only = BasicX509CredentialNameEvaluator::builder()
        .check_subject_dn_common_name(false)
        .check_subject_dn(false)
        .subject_alt_name_types([AltNameType::DnsName])
        .build();
    assert!(!dns_only
        .evaluate(
            &credential(FOO_1A1_GOOD),
            Some(&names(&["https://foo.example.org/sp"]))
        )
        .unwrap());
}

#[test]
fn subject_common_name() {
    let evaluator = only(false, true, false);

    assert!(evaluator
        .evaluate(&credential(FOO_1A1_GOOD), Some(&names(&["foo.example.org"])))
        .unwrap());

    // Only the most specific CN is considered.
    let multi = credential(FOO_MULTI_CN);
    assert!(evaluator
        .evaluate(&multi, Some(&names(&["foo.example.org"])))
        .unwrap());
    assert!(!evaluator
        .evaluate(&multi, Some(&names(&["bar.example.org"])))
        .unwrap());
}

#[test]
fn subject_dn() {
    let evaluator = only(false, false, true);
    let cred = credential(FOO_1A1_GOOD);

    for dn in [
        "CN=foo.example.org,OU=Shibboleth,O=Example Org,C=US",
        "cn=foo.example.org, ou=shibboleth, o=example org, c=us",
        "CN=foo.example.org; OU=Shibboleth; O=Example Org; C=US",
    ] {
        assert!(evaluator.evaluate(&cred, Some(&names(&[dn]))).unwrap(), "{dn}");
    }

    assert!(!evaluator
        .evaluate(&cred, Some(&names(&["CN=foo.example.org,O=Example Org,C=US"])))
        .unwrap());
    assert!(!evaluator
        .evaluate(&cred, Some(&names(&["foo.example.org"])))
        .unwrap());
}

#[test]
fn unparseable_trusted_names_are_skipped() {
    let evaluator = only(false, false, true);
    let cred = credential(FOO_1A1_GOOD);

    let trusted = names(&[
        "not a DN",
        "XYZZY=foo",
        "CN=foo.example.org,",
        "CN=foo.example.org,OU=Shibboleth,O=Example Org,C=US",
    ]);
    assert!(evaluator.evaluate(&cred, Some(&trusted)).unwrap());

    let trusted = names(&["not a DN", "XYZZY=foo"]);
    assert!(!evaluator.evaluate(&cred, Some(&trusted)).unwrap());
}

#[test]
fn alt_name_match_takes_priority() {
    let evaluator = BasicX509CredentialNameEvaluator::new();
    let cred = credential(FOO_1A1_GOOD);

    // Neither the CN nor the DN check could match this name.
    assert!(evaluator
        .evaluate(&cred, Some(&names(&["https://foo.example.org/sp"])))
        .unwrap());
}

#[test]
fn any_check_may_match() {
    let evaluator = BasicX509CredentialNameEvaluator::new();
    let cred = credential(FOO_MULTI_CN);

    assert!(evaluator
        .evaluate(&cred, Some(&names(&["foo.example.org"])))
        .unwrap());
    assert!(evaluator
        .evaluate(
            &cred,
            Some(&names(&["CN=foo.example.org,CN=bar.example.org,O=Example Org,C=US"]))
        )
        .unwrap());
    assert!(!evaluator
        .evaluate(&cred, Some(&names(&["bar.example.org", "foo@example.org"])))
        .unwrap());
}

#[test]
fn pass_through() {
    let evaluator = PassThroughNameEvaluator;
    assert!(evaluator
        .evaluate(&credential(FOO_1A1_GOOD), None)
        .unwrap());
    assert!(evaluator
        .evaluate(&credential(FOO_1A1_GOOD), Some(&names(&["no.such.name"])))
        .unwrap());
}
