use super::*;
use crate::{
    Content, ContentBody, Error, ID, InstantMessageDelegate, MessageConfig, Registry,
    ReliableMessageDelegate, SecureMessageDelegate, SymmetricKey,
};
use std::collections::HashSet;

/// XOR "cipher" with readable key wrapping, enough to observe what the
/// transitions ask the delegate to do.
#[derive(Default)]
struct MockDelegate {
    no_public_key: HashSet<ID>,
    no_signing_key: HashSet<ID>,
    broadcast: bool,
    cached_key: Option<SymmetricKey>,
    upload_url: Option<String>,
    fail_content: bool,
}

fn xor(data: &[u8], key: &SymmetricKey) -> Vec<u8> {
    data.iter()
        .zip(key.data().iter().cycle())
        .map(|(b, k)| b ^ k)
        .collect()
}

fn checksum(data: &[u8], sender: &ID) -> Vec<u8> {
    let sum = data
        .iter()
        .enumerate()
        .fold(0u32, |acc, (i, b)| acc.wrapping_mul(31).wrapping_add(*b as u32 + i as u32));
    format!("{sender}:{sum}").into_bytes()
}

impl InstantMessageDelegate for MockDelegate {
    fn upload_file_data(&self, _: &[u8], _: &InstantMessage) -> Result<Option<String>, Error> {
        Ok(self.upload_url.clone())
    }

    fn encrypt_content(
        &self,
        data: &[u8],
        password: &SymmetricKey,
        _: &InstantMessage,
    ) -> Result<Vec<u8>, Error> {
        if self.fail_content {
            return Err(Error::Delegate("cipher backend down".to_string()));
        }
        Ok(xor(data, password))
    }

    fn serialize_key(
        &self,
        password: &SymmetricKey,
        _: &InstantMessage,
    ) -> Result<Option<Vec<u8>>, Error> {
        if self.broadcast {
            return Ok(None);
        }
        Ok(Some(serde_json::to_vec(&password.to_record())?))
    }

    fn encrypt_key(
        &self,
        data: &[u8],
        receiver: &ID,
        _: &InstantMessage,
    ) -> Result<Option<Vec<u8>>, Error> {
        if self.no_public_key.contains(receiver) {
            return Ok(None);
        }
        let mut wrapped = format!("{receiver}|").into_bytes();
        wrapped.extend_from_slice(data);
        Ok(Some(wrapped))
    }
}

impl SecureMessageDelegate for MockDelegate {
    fn decrypt_key(
        &self,
        key: &[u8],
        _: &ID,
        receiver: &ID,
        _: &SecureMessage,
    ) -> Result<Vec<u8>, Error> {
        let prefix = format!("{receiver}|").into_bytes();
        key.strip_prefix(prefix.as_slice())
            .map(<[u8]>::to_vec)
            .ok_or_else(|| Error::Delegate(format!("key not wrapped for {receiver}")))
    }

    fn deserialize_key(
        &self,
        key: Option<&[u8]>,
        _: &ID,
        _: &ID,
        _: &SecureMessage,
    ) -> Result<Option<SymmetricKey>, Error> {
        match key {
            Some(bytes) => {
                SymmetricKey::parse(&crate::record::parse_json(bytes)?).map(Some)
            }
            None => Ok(self.cached_key.clone()),
        }
    }

    fn decrypt_content(
        &self,
        data: &[u8],
        password: &SymmetricKey,
        _: &SecureMessage,
    ) -> Result<Vec<u8>, Error> {
        Ok(xor(data, password))
    }

    fn sign_data(
        &self,
        data: &[u8],
        sender: &ID,
        _: &SecureMessage,
    ) -> Result<Option<Vec<u8>>, Error> {
        if self.no_signing_key.contains(sender) {
            return Ok(None);
        }
        Ok(Some(checksum(data, sender)))
    }
}

impl ReliableMessageDelegate for MockDelegate {
    fn verify_data_signature(
        &self,
        data: &[u8],
        signature: &[u8],
        sender: &ID,
        _: &ReliableMessage,
    ) -> bool {
        checksum(data, sender) == signature
    }
}

fn alice() -> ID {
    ID::new("alice@2Pc5gJrEQYoz9D9TJrL35sA3wvprNdenPi")
}

fn bob() -> ID {
    ID::new("bob@2ZyTgA3Ws3cFdqNsNJEH1upAMJzH6kPtM8")
}

fn carol() -> ID {
    ID::new("carol@4WDfe3zZ4T7opFSi3iDAKiuTnUHjxmXekk")
}

fn group() -> ID {
    ID::new("group@7ThVZeDuQAdG3eSDF6NeFjMDPjKN5SbrnM")
}

fn password() -> SymmetricKey {
    SymmetricKey::new("XOR", vec![0x5A, 0xA5, 0x3C])
}

fn instant(receiver: ID, content: Content) -> InstantMessage {
    InstantMessage::new(Envelope::create(alice(), receiver, Some(1545405083)), content)
}

#[test]
fn personal_round_trip() {
    let delegate = MockDelegate::default();
    let registry = Registry::default();
    let original = instant(bob(), Content::text("Hello world!"));

    let secure = original.encrypt(&password(), None, &delegate).unwrap();
    assert!(secure.key().is_some());
    assert!(secure.keys().is_none());
    assert_eq!(secure.envelope().type_hint(), Some(0x01));

    let reliable = secure.sign(&delegate).unwrap();
    let verified = reliable.verify(&delegate).unwrap().unwrap();
    assert_eq!(verified, secure);

    let (envelope, content) = verified
        .decrypt(None, &delegate, &registry)
        .unwrap()
        .into_parts();
    assert_eq!(&content, original.content());
    let mut expected = original.envelope().clone();
    expected.set_type_hint(Some(0x01));
    assert_eq!(envelope, expected);
}

#[test]
fn type_hint_stamping_follows_config() {
    let delegate = MockDelegate::default();
    let registry = Registry::default();
    let original = instant(bob(), Content::text("no hint"));
    assert_eq!(original.envelope().type_hint(), None);

    let config = MessageConfig {
        stamp_type_hint: false,
        ..Default::default()
    };
    let secure = original
        .encrypt_with(&password(), None, &delegate, &config)
        .unwrap();
    assert_eq!(secure.envelope().type_hint(), None);
    assert!(!secure.to_record().contains_key("type"));

    let decrypted = secure
        .decrypt_with(None, &delegate, &registry, &config)
        .unwrap();
    assert_eq!(decrypted, original);

    let mut envelope = Envelope::create(alice(), bob(), Some(1545405083));
    envelope.set_type_hint(Some(0x7A));
    let hinted = InstantMessage::new(envelope, Content::text("custom hint"));
    let secure = hinted.encrypt(&password(), None, &delegate).unwrap();
    assert_eq!(secure.envelope().type_hint(), Some(0x7A));
}

#[test]
fn reliable_survives_the_wire() {
    let delegate = MockDelegate::default();
    let registry = Registry::default();
    let original = instant(bob(), Content::text("over the wire"));
    let reliable = original
        .encrypt(&password(), None, &delegate)
        .unwrap()
        .sign(&delegate)
        .unwrap();

    let json = serde_json::to_vec(&reliable.to_record()).unwrap();
    let Message::Reliable(received) = registry.parse_json(&json).unwrap() else {
        panic!("expected a reliable message");
    };
    assert_eq!(received, reliable);

    let secure = received.verify(&delegate).unwrap().unwrap();
    let decrypted = secure.decrypt(None, &delegate, &registry).unwrap();
    assert_eq!(decrypted.content(), original.content());
}

#[test]
fn group_encrypt_skips_receivers_without_public_key() {
    let delegate = MockDelegate {
        no_public_key: HashSet::from([carol()]),
        ..Default::default()
    };
    let original = instant(group(), Content::text("hi all"));
    let members = [bob(), carol()];

    let secure = original.encrypt(&password(), Some(&members[..]), &delegate).unwrap();
    let keys = secure.keys().unwrap();
    assert_eq!(keys.len(), 1);
    assert!(keys.contains_key(&bob()));
    assert!(secure.key().is_none());
    assert_eq!(secure.envelope().group(), Some(&group()));
    assert_eq!(secure.envelope().receiver(), &group());
}

#[test]
fn group_encrypt_with_no_usable_key_omits_keys() {
    let delegate = MockDelegate {
        no_public_key: HashSet::from([bob(), carol()]),
        ..Default::default()
    };
    let original = instant(group(), Content::text("nobody"));
    let secure = original
        .encrypt(&password(), Some(&[bob(), carol()][..]), &delegate)
        .unwrap();
    assert!(secure.keys().is_none());
    assert!(!secure.to_record().contains_key("keys"));
}

#[test]
fn content_failure_is_fatal() {
    let delegate = MockDelegate {
        fail_content: true,
        ..Default::default()
    };
    let err = instant(bob(), Content::text("x"))
        .encrypt(&password(), None, &delegate)
        .unwrap_err();
    assert!(matches!(err, Error::Delegate(_)));
}

#[test]
fn split_gives_each_member_its_key() {
    let delegate = MockDelegate::default();
    let members = [bob(), carol()];
    let secure = instant(group(), Content::text("fan out"))
        .encrypt(&password(), Some(&members[..]), &delegate)
        .unwrap();
    let reliable = secure.sign(&delegate).unwrap();
    let keys = secure.keys().unwrap().clone();

    let copies = reliable.split(&members);
    assert_eq!(copies.len(), 2);
    for (copy, member) in copies.iter().zip(&members) {
        assert_eq!(copy.envelope().receiver(), member);
        assert_eq!(copy.envelope().group(), Some(&group()));
        assert_eq!(copy.secure().key(), keys.get(member).map(String::as_str));
        assert!(copy.secure().keys().is_none());
        assert_eq!(copy.signature(), reliable.signature());
        assert_eq!(copy, &reliable.trim(member));

        // the shared signature still verifies on every copy
        assert!(copy.verify(&delegate).unwrap().is_some());
    }
}

#[test]
fn split_copy_decrypts_for_its_member() {
    let delegate = MockDelegate::default();
    let registry = Registry::default();
    let members = [bob(), carol()];
    let original = instant(group(), Content::text("for members"));
    let secure = original
        .encrypt(&password(), Some(&members[..]), &delegate)
        .unwrap();

    for copy in secure.split(&members) {
        let msg = copy.decrypt(None, &delegate, &registry).unwrap();
        assert_eq!(msg.content(), original.content());
        assert_eq!(msg.envelope().group(), Some(&group()));
        assert_eq!(msg.envelope().receiver(), copy.envelope().receiver());
    }
}

#[test]
fn group_message_decrypts_for_member_without_split() {
    let delegate = MockDelegate::default();
    let registry = Registry::default();
    let original = instant(group(), Content::text("direct"));
    let mut secure = original
        .encrypt(&password(), Some(&[bob(), carol()][..]), &delegate)
        .unwrap();

    let msg = secure.decrypt(Some(&carol()), &delegate, &registry).unwrap();
    assert_eq!(msg.envelope().receiver(), &carol());
    assert_eq!(msg.envelope().group(), Some(&group()));

    // without the group stamp the receiver is taken as the group
    secure = SecureMessage::new(
        {
            let mut envelope = secure.envelope().clone();
            envelope.set_group(None);
            envelope
        },
        secure.data().to_string(),
        None,
        secure.keys().cloned(),
    )
    .unwrap();
    let msg = secure.decrypt(Some(&bob()), &delegate, &registry).unwrap();
    assert_eq!(msg.envelope().group(), Some(&group()));
    assert_eq!(msg.envelope().receiver(), &bob());

    let err = secure.decrypt(Some(&group()), &delegate, &registry).unwrap_err();
    assert!(matches!(err, Error::Format(_)));
}

#[test]
fn trim_recovers_group_from_receiver() {
    let delegate = MockDelegate::default();
    let secure = instant(group(), Content::text("trim"))
        .encrypt(&password(), Some(&[bob()][..]), &delegate)
        .unwrap();
    let plain = SecureMessage::new(
        Envelope::create(alice(), group(), Some(1)),
        secure.data().to_string(),
        None,
        secure.keys().cloned(),
    )
    .unwrap();

    let trimmed = plain.trim(&bob());
    assert_eq!(trimmed.envelope().group(), Some(&group()));
    assert_eq!(trimmed.envelope().receiver(), &bob());
    assert_eq!(trimmed.key(), plain.keys().unwrap().get(&bob()).map(String::as_str));

    // trimming again keeps the extracted key
    assert_eq!(trimmed.trim(&bob()).key(), trimmed.key());
}

#[test]
fn tampered_data_is_a_mismatch_not_an_error() {
    let delegate = MockDelegate::default();
    let registry = Registry::default();
    let reliable = instant(bob(), Content::text("integrity"))
        .encrypt(&password(), None, &delegate)
        .unwrap()
        .sign(&delegate)
        .unwrap();

    let mut record = reliable.to_record();
    let mut data = crate::record::get_bytes(&record, "data").unwrap().unwrap();
    data[0] ^= 0xFF;
    crate::record::put_bytes(&mut record, "data", Some(data.as_slice()));
    let tampered = registry.parse_reliable(&record).unwrap();

    assert_eq!(tampered.verify(&delegate), Ok(None));
}

#[test]
fn malformed_signature_is_a_format_error() {
    let delegate = MockDelegate::default();
    let registry = Registry::default();
    let reliable = instant(bob(), Content::text("x"))
        .encrypt(&password(), None, &delegate)
        .unwrap()
        .sign(&delegate)
        .unwrap();
    let mut record = reliable.to_record();
    record.insert("signature".to_string(), serde_json::json!("@@not base64@@"));
    let broken = registry.parse_reliable(&record).unwrap();
    assert!(matches!(broken.verify(&delegate), Err(Error::Format(_))));
}

#[test]
fn missing_signing_key() {
    let delegate = MockDelegate {
        no_signing_key: HashSet::from([alice()]),
        ..Default::default()
    };
    let secure = instant(bob(), Content::text("unsigned"))
        .encrypt(&password(), None, &delegate)
        .unwrap();
    assert_eq!(
        secure.sign(&delegate).unwrap_err(),
        Error::SignatureUnavailable(alice().to_string())
    );
}

#[test]
fn broadcast_key_resolves_from_cache() {
    let registry = Registry::default();
    let sender = MockDelegate {
        broadcast: true,
        ..Default::default()
    };
    let original = instant(bob(), Content::text("reused key"));
    let secure = original.encrypt(&password(), None, &sender).unwrap();
    assert!(secure.key().is_none());

    let err = secure.decrypt(None, &sender, &registry).unwrap_err();
    assert!(matches!(err, Error::NoKey { .. }));

    let receiver = MockDelegate {
        cached_key: Some(password()),
        ..Default::default()
    };
    let msg = secure.decrypt(None, &receiver, &registry).unwrap();
    assert_eq!(msg.content(), original.content());
}

#[test]
fn uploaded_file_gets_password_on_decrypt() {
    let delegate = MockDelegate {
        upload_url: Some("https://cdn.example.com/f/1.png".to_string()),
        ..Default::default()
    };
    let registry = Registry::default();
    let original = instant(bob(), Content::image("1.png", vec![1, 2, 3, 4], Some(vec![8])));

    let secure = original.encrypt(&password(), None, &delegate).unwrap();
    let msg = secure.decrypt(None, &delegate, &registry).unwrap();
    let file = msg.content().as_file().unwrap();
    assert_eq!(file.url.as_deref(), Some("https://cdn.example.com/f/1.png"));
    assert_eq!(file.data, None);
    assert_eq!(file.thumbnail, Some(vec![8]));
    assert_eq!(file.password.as_ref(), Some(&password()));

    let config = MessageConfig {
        attach_file_password: false,
        ..Default::default()
    };
    let msg = secure
        .decrypt_with(None, &delegate, &registry, &config)
        .unwrap();
    assert_eq!(msg.content().as_file().unwrap().password, None);
}

#[test]
fn file_without_upload_keeps_data_in_memory_only() {
    let delegate = MockDelegate::default();
    let registry = Registry::default();
    let original = instant(bob(), Content::file("notes.txt", b"secret".to_vec()));
    let secure = original.encrypt(&password(), None, &delegate).unwrap();
    let msg = secure.decrypt(None, &delegate, &registry).unwrap();
    let file = msg.content().as_file().unwrap();
    assert_eq!(file.data, None);
    assert_eq!(file.url, None);
    assert_eq!(file.password, None);
    assert_eq!(file.filename.as_deref(), Some("notes.txt"));
}

#[test]
fn forward_nests_a_verifiable_message() {
    let delegate = MockDelegate::default();
    let registry = Registry::default();
    let secret = instant(carol(), Content::text("top secret"))
        .encrypt(&password(), None, &delegate)
        .unwrap()
        .sign(&delegate)
        .unwrap();

    let wrapper = instant(bob(), Content::forward(secret.clone()));
    let received = wrapper
        .encrypt(&password(), None, &delegate)
        .unwrap()
        .decrypt(None, &delegate, &registry)
        .unwrap();

    let ContentBody::Forward(inner) = received.content().body() else {
        panic!("expected a forward content");
    };
    assert_eq!(inner.as_ref(), &secret);
    assert!(inner.verify(&delegate).unwrap().is_some());
}
