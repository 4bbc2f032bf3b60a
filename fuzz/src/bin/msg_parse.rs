#[macro_use]
extern crate afl;
use dimp::Registry;

fn main() {
    let registry = Registry::default();

    fuzz!(|data: &[u8]| {
        if let Ok(msg) = registry.parse_json(data) {
            let _ = registry.parse_message(&msg.to_record());
        }
    });
}
