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

use crate::pkix::name_constraints::{
    dns_matches, email_matches, ip_matches, uri_host, uri_host_matches,
};

#[test]
fn dns() {
    assert!(dns_matches("example.com", "example.com"));
    assert!(dns_matches("host.example.com", "example.com"));
    assert!(!dns_matches("badexample.com", "example.com"));
    assert!(!dns_matches("example.org", "example.com"));

    assert!(dns_matches("host.example.com", ".example.com"));
    assert!(!dns_matches("example.com", ".example.com"));

    assert!(dns_matches("anything.at.all", ""));
}

#[test]
fn email() {
    assert!(email_matches("foo@example.org", "foo@example.org"));
    assert!(!email_matches("bar@example.org", "foo@example.org"));

    assert!(email_matches("foo@example.org", "example.org"));
    assert!(!email_matches("foo@mail.example.org", "example.org"));

    assert!(email_matches("foo@mail.example.org", ".example.org"));
    assert!(!email_matches("foo@example.org", ".example.org"));

    assert!(!email_matches("not-an-address", "example.org"));
}

#[test]
fn uri() {
    assert_eq!(
        uri_host("https://Foo.Example.org/sp"),
        Some("foo.example.org".to_string())
    );
    assert_eq!(
        uri_host("https://user@foo.example.org:8443/path?q#f"),
        Some("foo.example.org".to_string())
    );
    assert_eq!(uri_host("https://[2001:db8::1]:443/"), Some("2001:db8::1".to_string()));
    assert_eq!(uri_host("urn:oasis:names:tc:SAML:2.0"), None);
    assert_eq!(uri_host("file:///etc/passwd"), None);
    assert_eq!(uri_host("https://user@[::1]:8443/x"), Some("::1".to_string()));
    assert_eq!(uri_host("//foo.example.org/x"), None);
    assert_eq!(uri_host("mailto:foo@example.org"), None);
    assert_eq!(
        uri_host("https://B\u{fc}cher.example/"),
        Some("xn--bcher-kva.example".to_string())
    );

    assert!(uri_host_matches("foo.example.org", "foo.example.org"));
    assert!(!uri_host_matches("bar.example.org", "foo.example.org"));
    assert!(uri_host_matches("foo.example.org", ".example.org"));
    assert!(!uri_host_matches("example.org", ".example.org"));
}

#[test]
fn ip() {
    let v4 = [192, 168, 1, 20];
    assert!(ip_matches(&v4, &[192, 168, 0, 0, 255, 255, 0, 0]));
    assert!(!ip_matches(&v4, &[10, 0, 0, 0, 255, 0, 0, 0]));
    assert!(ip_matches(&v4, &[192, 168, 1, 20, 255, 255, 255, 255]));

    // Address family mismatch.
    let mut v6_constraint = vec![0u8; 32];
    v6_constraint[16] = 0xff;
    assert!(!ip_matches(&v4, &v6_constraint));

    let mut v6 = [0u8; 16];
    v6[0] = 0x20;
    v6[1] = 0x01;
    let mut constraint = vec![0u8; 32];
    constraint[0] = 0x20;
    constraint[1] = 0x01;
    constraint[16] = 0xff;
    constraint[17] = 0xff;
    assert!(ip_matches(&v6, &constraint));
}
