/// Knobs for the message transitions.
#[derive(Clone, Debug)]
pub struct MessageConfig {
    /// Attach the resolved session key to URL-only file contents on decrypt.
    pub attach_file_password: bool,
    /// Copy the content type onto the envelope of an encrypted message.
    pub stamp_type_hint: bool,
}

impl Default for MessageConfig {
    fn default() -> Self {
        Self {
            attach_file_password: true,
            stamp_type_hint: true,
        }
    }
}
