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
        PkixValidationInformation, PkixValidationInformationResolver,
        StaticPkixValidationInformationResolver, TrustedNames,
    },
    tests::test_utils::{certs, ROOT1_CA, ROOT2_CA},
    CriteriaSet, EntityIdCriterion, TrustedNamesCriterion,
};

fn static_names() -> TrustedNames {
    ["foo.example.org", "bar.example.org"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn criteria() -> CriteriaSet {
    CriteriaSet::new()
        .with_entity_id(EntityIdCriterion::new("urn:test:foo"))
        .with_trusted_names(TrustedNamesCriterion::new(["dynamic.example.org"]))
}

#[test]
fn resolve() {
    let infos = vec![
        PkixValidationInformation::new(certs(&[ROOT1_CA]), vec![], Some(2)),
        PkixValidationInformation::new(certs(&[ROOT2_CA]), vec![], None),
    ];
    let resolver = StaticPkixValidationInformationResolver::new(infos.clone(), TrustedNames::new());

    assert_eq!(resolver.resolve(&CriteriaSet::new()).unwrap(), infos);
    assert_eq!(
        resolver.resolve_single(&CriteriaSet::new()).unwrap(),
        infos.first().cloned()
    );
    assert!(resolver.supports_trusted_name_resolution());
}

#[test]
fn resolve_empty() {
    let resolver = StaticPkixValidationInformationResolver::default();

    assert!(resolver.resolve(&CriteriaSet::new()).unwrap().is_empty());
    assert!(resolver.resolve_single(&CriteriaSet::new()).unwrap().is_none());
    assert!(resolver
        .resolve_trusted_names(&CriteriaSet::new())
        .unwrap()
        .is_empty());
}

#[test]
fn trusted_names_static_only() {
    let resolver = StaticPkixValidationInformationResolver::new(vec![], static_names());
    assert!(!resolver.supports_dynamic_trusted_names());

    let names = resolver.resolve_trusted_names(&criteria()).unwrap();

    assert_eq!(names.len(), 3);
    assert!(names.contains("foo.example.org"));
    assert!(names.contains("bar.example.org"));
    assert!(names.contains("urn:test:foo"));
    assert!(!names.contains("dynamic.example.org"));
}

#[test]
fn trusted_names_dynamic() {
    let resolver = StaticPkixValidationInformationResolver::with_dynamic_trusted_names(
        vec![],
        static_names(),
        true,
    );
    assert!(resolver.supports_dynamic_trusted_names());

    let names = resolver.resolve_trusted_names(&criteria()).unwrap();

    assert_eq!(names.len(), 4);
    assert!(names.contains("dynamic.example.org"));
    assert!(names.contains("urn:test:foo"));
}

#[test]
fn trusted_names_without_criteria() {
    let resolver = StaticPkixValidationInformationResolver::with_dynamic_trusted_names(
        vec![],
        static_names(),
        true,
    );

    assert_eq!(
        resolver.resolve_trusted_names(&CriteriaSet::new()).unwrap(),
        static_names()
    );
}
