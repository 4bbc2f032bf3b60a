#[macro_use]
extern crate afl;
use dimp::{ID, Keyring, Message, Registry};

fn get_keyring() -> Keyring {
    // The victim
    let mut keyring = Keyring::new();
    let bob = ID::new("bob@4WBSiDzg9cpZGPqFrQ4bHcq4U5z9QAQLHS");
    keyring.create_identity(bob).expect("Setup failed");

    // The attacker, known as a contact
    let alice = ID::new("alice@2Pc5gJrEQYoz9D9TJrL35sA3wvprNdenPi");
    let visa = Keyring::new()
        .create_identity(alice.clone())
        .expect("Setup failed");
    keyring.add_contact(alice, visa);
    keyring
}

fn main() {
    let keyring = get_keyring();
    let registry = Registry::default();

    fuzz!(|data: &[u8]| {
        if let Ok(Message::Reliable(msg)) = registry.parse_json(data) {
            let _ = msg.secure().decrypt(None, &keyring, &registry);
            if let Ok(Some(secure)) = msg.verify(&keyring) {
                let _ = secure.decrypt(None, &keyring, &registry);
            }
        }
    });
}
