//! CryptoSettings - reads and writes the settings map, encrypted when possible.
//!
//! # Key lifecycle
//! - The key is looked up lazily on first use and cached for the lifetime of
//!   the codec. A missing key (or a failed lookup) creates and stores a new one.
//! - Every encrypted write advances a 64-bit nonce counter. Reaching
//!   `u64::MAX` rotates the key and restarts the counter at zero, so a
//!   `(key, nonce)` pair is never reused.
//! - Reading an encrypted file moves the counter forward to the file's nonce.
//!   It never moves backwards.
//! - A stored key whose counter was never restored from a file is not used
//!   for writing: the first write rotates it instead.
//!
//! # Fallback
//! If a key cannot be created or cleared, the codec switches to plaintext for
//! every later write. The write that hit the failure still fails.

use std::io::{ErrorKind, Read, Write};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chacha20poly1305::aead::{AeadInPlace, KeyInit};
use chacha20poly1305::{ChaCha20Poly1305, Key, Nonce, Tag};
use serde_json::{Map, Value};
use tracing::{debug, error, info, warn};

use super::format::{
    CIPHERTEXT_OFFSET, MAC_SIZE, NONCE_SIZE, VERSION_SIZE, Version, decode_counter, encode_nonce,
};
use crate::domain::SettingsKey;
use crate::error::{KeyStoreError, SettingsError};
use crate::ports::KeyStore;

/// Flat key/value settings document.
pub type SettingsMap = Map<String, Value>;

/// Mutable codec state. One lock guards key, counter and version together.
struct KeyState {
    key: Option<SettingsKey>,
    last_nonce: u64,

    /// `last_nonce` is at or past every nonce ever sealed under `key`.
    nonce_synced: bool,

    /// Probed once, then only ever downgraded to `NoEncryption`.
    version: Option<Version>,
}

pub struct CryptoSettings {
    key_store: Arc<dyn KeyStore>,
    state: Mutex<KeyState>,
}

impl CryptoSettings {
    pub fn new(key_store: Arc<dyn KeyStore>) -> Self {
        Self {
            key_store,
            state: Mutex::new(KeyState {
                key: None,
                last_nonce: 0,
                nonce_synced: false,
                version: None,
            }),
        }
    }

    /// Format used by the next write.
    pub fn supported_version(&self) -> Version {
        let mut state = self.lock();
        self.probe_version(&mut state)
    }

    /// Counter of the most recent nonce written or read.
    pub fn last_nonce(&self) -> u64 {
        self.lock().last_nonce
    }

    /// Decode a settings file.
    ///
    /// Any failure means "no usable settings". Callers must not treat it as an
    /// empty map.
    pub fn read_file<R: Read + ?Sized>(&self, reader: &mut R) -> Result<SettingsMap, SettingsError> {
        debug!("reading settings file");

        let mut version = [0u8; VERSION_SIZE];
        read_exact(reader, &mut version, "version")?;

        match Version::try_from(version[0])? {
            Version::NoEncryption => {
                let mut content = Vec::new();
                reader.read_to_end(&mut content)?;
                parse_map(&content)
            }
            Version::EncryptionChachaPolyV1 => self.read_encrypted(reader),
        }
    }

    /// Encode `map` and write it with a single `write_all`.
    pub fn write_file<W: Write + ?Sized>(
        &self,
        writer: &mut W,
        map: &SettingsMap,
    ) -> Result<(), SettingsError> {
        let frame = self.encode(map)?;
        writer.write_all(&frame).map_err(SettingsError::WriteError)?;
        writer.flush().map_err(SettingsError::WriteError)?;
        Ok(())
    }

    /// Forget the key: clear the secret store, the cached key and the counter.
    pub fn reset_key(&self) -> Result<(), SettingsError> {
        info!("resetting settings key");

        let mut state = self.lock();
        state.key = None;
        state.last_nonce = 0;
        state.nonce_synced = false;

        if let Err(e) = self.key_store.clear_key() {
            error!(error = %e, "settings key reset failed");
            fall_back_to_plaintext(&mut state);
            return Err(SettingsError::KeyUnavailable(e));
        }
        // 次の書き込みで secret store を再確認する
        state.version = None;
        Ok(())
    }

    fn read_encrypted<R: Read + ?Sized>(&self, reader: &mut R) -> Result<SettingsMap, SettingsError> {
        let mut nonce = [0u8; NONCE_SIZE];
        read_exact(reader, &mut nonce, "nonce")?;

        let mut mac = [0u8; MAC_SIZE];
        read_exact(reader, &mut mac, "mac")?;

        let mut buffer = Vec::new();
        reader.read_to_end(&mut buffer)?;
        if buffer.is_empty() {
            return Err(SettingsError::TruncatedRead("ciphertext"));
        }

        let mut state = self.lock();
        let key = self.key(&mut state)?;

        let cipher = ChaCha20Poly1305::new(Key::from_slice(key.as_bytes()));
        cipher
            .decrypt_in_place_detached(
                Nonce::from_slice(&nonce),
                &[Version::EncryptionChachaPolyV1.as_byte()],
                &mut buffer,
                Tag::from_slice(&mac),
            )
            .map_err(|_| {
                warn!("settings file failed authentication");
                SettingsError::DecryptionFailed
            })?;

        let map = parse_map(&buffer)?;
        state.last_nonce = state.last_nonce.max(decode_counter(&nonce));
        state.nonce_synced = true;
        Ok(map)
    }

    fn encode(&self, map: &SettingsMap) -> Result<Vec<u8>, SettingsError> {
        let plaintext = serde_json::to_vec(map)
            .map_err(|e| SettingsError::InvalidFormat(format!("cannot serialize settings: {e}")))?;

        let mut state = self.lock();
        let version = self.probe_version(&mut state);

        let mut frame = Vec::with_capacity(CIPHERTEXT_OFFSET + plaintext.len());
        frame.push(version.as_byte());

        match version {
            Version::NoEncryption => {
                debug!("writing plaintext settings");
                frame.extend_from_slice(&plaintext);
            }
            Version::EncryptionChachaPolyV1 => {
                debug!("writing encrypted settings");
                self.seal(&mut state, plaintext, &mut frame)?;
            }
        }
        Ok(frame)
    }

    fn seal(
        &self,
        state: &mut KeyState,
        mut buffer: Vec<u8>,
        frame: &mut Vec<u8>,
    ) -> Result<(), SettingsError> {
        self.key(state)?;
        if !state.nonce_synced {
            info!("nonce counter unknown for stored settings key, rotating it");
            self.rotate_key(state)?;
        }
        let counter = self.next_nonce(state)?;
        let key = state.key.clone().ok_or(SettingsError::EncryptionFailed)?;
        let nonce = encode_nonce(counter);

        let cipher = ChaCha20Poly1305::new(Key::from_slice(key.as_bytes()));
        let tag = cipher
            .encrypt_in_place_detached(
                Nonce::from_slice(&nonce),
                &[Version::EncryptionChachaPolyV1.as_byte()],
                &mut buffer,
            )
            .map_err(|_| SettingsError::EncryptionFailed)?;

        frame.extend_from_slice(&nonce);
        frame.extend_from_slice(tag.as_slice());
        frame.extend_from_slice(&buffer);
        Ok(())
    }

    /// Advance the counter, rotating the key when it would hit `u64::MAX`.
    fn next_nonce(&self, state: &mut KeyState) -> Result<u64, SettingsError> {
        let next = state.last_nonce.saturating_add(1);
        if next == u64::MAX {
            info!("nonce counter exhausted, rotating settings key");
            self.rotate_key(state)?;
        } else {
            state.last_nonce = next;
        }
        Ok(state.last_nonce)
    }

    /// New key with the counter back at zero.
    fn rotate_key(&self, state: &mut KeyState) -> Result<(), SettingsError> {
        let key = SettingsKey::generate();
        if let Err(e) = self.key_store.store_key(&key) {
            error!(error = %e, "failed to store rotated settings key");
            fall_back_to_plaintext(state);
            return Err(SettingsError::KeyUnavailable(e));
        }
        state.key = Some(key);
        state.last_nonce = 0;
        state.nonce_synced = true;
        Ok(())
    }

    /// Cached key, else the stored one, else a freshly created one.
    fn key(&self, state: &mut KeyState) -> Result<SettingsKey, SettingsError> {
        if let Some(key) = &state.key {
            return Ok(key.clone());
        }

        if !self.probe_version(state).is_encrypted() {
            return Err(SettingsError::KeyUnavailable(KeyStoreError::Unavailable(
                "encrypted settings are not supported".into(),
            )));
        }

        match self.key_store.lookup_key() {
            Ok(Some(key)) => {
                state.key = Some(key.clone());
                return Ok(key);
            }
            Ok(None) => debug!("settings key not found, creating one"),
            // lookup の失敗は「鍵なし」と同じ扱い
            Err(e) => warn!(error = %e, "settings key lookup failed, creating one"),
        }

        let key = SettingsKey::generate();
        if let Err(e) = self.key_store.store_key(&key) {
            error!(error = %e, "failed to store settings key");
            fall_back_to_plaintext(state);
            return Err(SettingsError::KeyUnavailable(e));
        }
        state.key = Some(key.clone());
        // 新しい鍵ではどの nonce も未使用
        state.nonce_synced = true;
        Ok(key)
    }

    fn probe_version(&self, state: &mut KeyState) -> Version {
        *state.version.get_or_insert_with(|| {
            if self.key_store.is_available() {
                Version::EncryptionChachaPolyV1
            } else {
                info!("secret store unavailable, settings are stored as plaintext");
                Version::NoEncryption
            }
        })
    }

    fn lock(&self) -> MutexGuard<'_, KeyState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn fall_back_to_plaintext(state: &mut KeyState) {
    warn!("falling back to plaintext settings");
    state.version = Some(Version::NoEncryption);
    state.key = None;
    state.nonce_synced = false;
}

fn read_exact<R: Read + ?Sized>(
    reader: &mut R,
    buf: &mut [u8],
    what: &'static str,
) -> Result<(), SettingsError> {
    reader.read_exact(buf).map_err(|e| {
        if e.kind() == ErrorKind::UnexpectedEof {
            SettingsError::TruncatedRead(what)
        } else {
            SettingsError::Io(e)
        }
    })
}

fn parse_map(content: &[u8]) -> Result<SettingsMap, SettingsError> {
    match serde_json::from_slice::<Value>(content) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(SettingsError::InvalidFormat(
            "settings content is not a JSON object".into(),
        )),
        Err(e) => Err(SettingsError::InvalidFormat(format!("malformed JSON: {e}"))),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    use rstest::rstest;
    use serde_json::json;

    use super::*;
    use crate::impls::MemoryKeyStore;
    use crate::settings::format::MAC_OFFSET;

    fn sample_map() -> SettingsMap {
        json!({
            "someString": "Lorem Ipsum",
            "someInteger": 9001,
            "someBool": true,
        })
        .as_object()
        .unwrap()
        .clone()
    }

    fn encrypted_codec() -> (CryptoSettings, Arc<MemoryKeyStore>) {
        let store = Arc::new(MemoryKeyStore::new());
        (CryptoSettings::new(store.clone()), store)
    }

    fn write(codec: &CryptoSettings, map: &SettingsMap) -> Vec<u8> {
        let mut out = Vec::new();
        codec.write_file(&mut out, map).unwrap();
        out
    }

    fn read(codec: &CryptoSettings, bytes: &[u8]) -> Result<SettingsMap, SettingsError> {
        codec.read_file(&mut &bytes[..])
    }

    fn nonce_counter(bytes: &[u8]) -> u64 {
        let nonce: [u8; NONCE_SIZE] = bytes[VERSION_SIZE..MAC_OFFSET].try_into().unwrap();
        decode_counter(&nonce)
    }

    /// Store whose writes always fail.
    struct BrokenStore;

    impl KeyStore for BrokenStore {
        fn lookup_key(&self) -> Result<Option<SettingsKey>, KeyStoreError> {
            Ok(None)
        }
        fn store_key(&self, _key: &SettingsKey) -> Result<(), KeyStoreError> {
            Err(KeyStoreError::Unavailable("locked".into()))
        }
        fn clear_key(&self) -> Result<(), KeyStoreError> {
            Err(KeyStoreError::Unavailable("locked".into()))
        }
    }

    /// Counts lookups to check the key is memoized.
    struct CountingStore {
        inner: MemoryKeyStore,
        lookups: AtomicUsize,
    }

    impl KeyStore for CountingStore {
        fn lookup_key(&self) -> Result<Option<SettingsKey>, KeyStoreError> {
            self.lookups.fetch_add(1, Ordering::SeqCst);
            self.inner.lookup_key()
        }
        fn store_key(&self, key: &SettingsKey) -> Result<(), KeyStoreError> {
            self.inner.store_key(key)
        }
        fn clear_key(&self) -> Result<(), KeyStoreError> {
            self.inner.clear_key()
        }
    }

    /// Refuses `store_key` while `refuse_store` is set.
    struct FlakyStore {
        inner: MemoryKeyStore,
        refuse_store: AtomicBool,
    }

    impl KeyStore for FlakyStore {
        fn lookup_key(&self) -> Result<Option<SettingsKey>, KeyStoreError> {
            self.inner.lookup_key()
        }
        fn store_key(&self, key: &SettingsKey) -> Result<(), KeyStoreError> {
            if self.refuse_store.load(Ordering::SeqCst) {
                return Err(KeyStoreError::Unavailable("locked".into()));
            }
            self.inner.store_key(key)
        }
        fn clear_key(&self) -> Result<(), KeyStoreError> {
            self.inner.clear_key()
        }
    }

    struct FailingWriter;

    impl Write for FailingWriter {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            Err(std::io::Error::other("disk full"))
        }
        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn encrypted_roundtrip_of_example_settings() {
        let (codec, _store) = encrypted_codec();

        let bytes = write(&codec, &sample_map());
        assert_eq!(bytes[0], 0x01);

        let restored = read(&codec, &bytes).unwrap();
        assert_eq!(restored, sample_map());
    }

    #[rstest]
    #[case::encrypted(true, Version::EncryptionChachaPolyV1)]
    #[case::plaintext(false, Version::NoEncryption)]
    fn roundtrip_preserves_json_values(#[case] available: bool, #[case] version: Version) {
        let store = if available {
            MemoryKeyStore::new()
        } else {
            MemoryKeyStore::unavailable()
        };
        let codec = CryptoSettings::new(Arc::new(store));
        assert_eq!(codec.supported_version(), version);

        let map = json!({
            "string": "ünïcødé",
            "int": -42,
            "float": 1.5,
            "bool": false,
            "array": [1, "two", true],
            "empty": "",
        })
        .as_object()
        .unwrap()
        .clone();

        let bytes = write(&codec, &map);
        assert_eq!(bytes[0], version.as_byte());
        assert_eq!(read(&codec, &bytes).unwrap(), map);
    }

    #[test]
    fn plaintext_file_is_compact_json() {
        let codec = CryptoSettings::new(Arc::new(MemoryKeyStore::unavailable()));
        let bytes = write(&codec, &sample_map());

        assert_eq!(bytes[0], 0x00);
        let body = std::str::from_utf8(&bytes[1..]).unwrap();
        assert!(!body.contains(": ") && !body.contains(", "));
        let parsed: Value = serde_json::from_str(body).unwrap();
        assert_eq!(parsed, Value::Object(sample_map()));
    }

    #[test]
    fn empty_map_roundtrips_encrypted() {
        let (codec, _store) = encrypted_codec();
        let bytes = write(&codec, &SettingsMap::new());
        assert_eq!(read(&codec, &bytes).unwrap(), SettingsMap::new());
    }

    #[test]
    fn any_flipped_bit_in_tag_or_ciphertext_is_detected() {
        let (codec, _store) = encrypted_codec();
        let bytes = write(&codec, &sample_map());

        for index in MAC_OFFSET..bytes.len() {
            let mut tampered = bytes.clone();
            tampered[index] ^= 1 << (index % 8);
            let result = read(&codec, &tampered);
            assert!(
                matches!(result, Err(SettingsError::DecryptionFailed)),
                "byte {index} not detected: {result:?}"
            );
        }
    }

    #[test]
    fn flipped_nonce_is_detected() {
        let (codec, _store) = encrypted_codec();
        let mut bytes = write(&codec, &sample_map());
        bytes[VERSION_SIZE] ^= 0x80;
        assert!(matches!(read(&codec, &bytes), Err(SettingsError::DecryptionFailed)));
    }

    #[test]
    fn trailing_padding_is_detected() {
        let (codec, _store) = encrypted_codec();
        let mut bytes = write(&codec, &sample_map());
        bytes.push(0xb2);
        assert!(matches!(read(&codec, &bytes), Err(SettingsError::DecryptionFailed)));
    }

    #[test]
    fn file_from_another_key_is_rejected() {
        let (writer, _) = encrypted_codec();
        let (reader, _) = encrypted_codec();

        let bytes = write(&writer, &sample_map());
        assert!(matches!(read(&reader, &bytes), Err(SettingsError::DecryptionFailed)));
    }

    #[rstest]
    #[case::empty(vec![], "version")]
    #[case::version_only(vec![0x01], "nonce")]
    #[case::short_nonce(vec![0x01; 8], "nonce")]
    #[case::no_mac(vec![0x01; 13], "mac")]
    #[case::no_ciphertext(vec![0x01; 29], "ciphertext")]
    fn truncated_files_are_rejected(#[case] bytes: Vec<u8>, #[case] missing: &str) {
        let (codec, _store) = encrypted_codec();
        match read(&codec, &bytes) {
            Err(SettingsError::TruncatedRead(what)) => assert_eq!(what, missing),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[rstest]
    #[case::unknown_version(b"\x07{}".to_vec())]
    #[case::json_array(b"\x00[1,2,3]".to_vec())]
    #[case::json_string(b"\x00\"hello\"".to_vec())]
    #[case::malformed(b"\x00{\"a\":".to_vec())]
    #[case::plaintext_empty(b"\x00".to_vec())]
    fn invalid_content_is_rejected(#[case] bytes: Vec<u8>) {
        let (codec, _store) = encrypted_codec();
        assert!(matches!(read(&codec, &bytes), Err(SettingsError::InvalidFormat(_))));
    }

    #[test]
    fn consecutive_writes_use_sequential_nonces() {
        let (codec, _store) = encrypted_codec();

        let first = write(&codec, &sample_map());
        let second = write(&codec, &sample_map());

        let n1 = nonce_counter(&first);
        let n2 = nonce_counter(&second);
        assert_eq!(n2, n1 + 1);
        assert_eq!(codec.last_nonce(), n2);
        assert_eq!(&second[MAC_OFFSET - 4..MAC_OFFSET], &[0, 0, 0, 0]);
    }

    #[test]
    fn counter_exhaustion_rotates_key() {
        let (codec, store) = encrypted_codec();
        write(&codec, &sample_map());
        let initial_key = store.current().unwrap();

        codec.lock().last_nonce = u64::MAX - 1;
        let bytes = write(&codec, &sample_map());

        let final_key = store.current().unwrap();
        assert_ne!(initial_key, final_key);
        assert_eq!(codec.last_nonce(), 0);
        assert_eq!(nonce_counter(&bytes), 0);

        // the file is sealed with the new key
        let fresh = CryptoSettings::new(Arc::new(MemoryKeyStore::with_key(final_key)));
        assert_eq!(read(&fresh, &bytes).unwrap(), sample_map());
    }

    #[test]
    fn reading_restores_counter_from_file() {
        let (codec, _store) = encrypted_codec();
        codec.lock().last_nonce = 12345;

        let bytes = write(&codec, &sample_map());
        assert_eq!(codec.last_nonce(), 12346);

        codec.lock().last_nonce = 555;
        read(&codec, &bytes).unwrap();
        assert_eq!(codec.last_nonce(), 12346);
    }

    #[test]
    fn failed_read_leaves_counter_untouched() {
        let (codec, _store) = encrypted_codec();
        let mut bytes = write(&codec, &sample_map());
        codec.lock().last_nonce = 7;

        bytes[CIPHERTEXT_OFFSET] ^= 0x01;
        assert!(read(&codec, &bytes).is_err());
        assert_eq!(codec.last_nonce(), 7);
    }

    #[test]
    fn key_is_looked_up_once() {
        let store = Arc::new(CountingStore {
            inner: MemoryKeyStore::new(),
            lookups: AtomicUsize::new(0),
        });
        let codec = CryptoSettings::new(store.clone());

        let bytes = write(&codec, &sample_map());
        write(&codec, &sample_map());
        read(&codec, &bytes).unwrap();

        assert_eq!(store.lookups.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn existing_stored_key_is_reused_for_reading() {
        let (writer, store) = encrypted_codec();
        let bytes = write(&writer, &sample_map());
        let key = store.current().unwrap();

        let reader = CryptoSettings::new(Arc::new(MemoryKeyStore::with_key(key.clone())));
        assert_eq!(read(&reader, &bytes).unwrap(), sample_map());
        assert_eq!(reader.last_nonce(), 1);

        // counter restored from the file: the key stays and the sequence continues
        let next = write(&reader, &sample_map());
        assert_eq!(nonce_counter(&next), 2);
        let fresh = CryptoSettings::new(Arc::new(MemoryKeyStore::with_key(key)));
        assert_eq!(read(&fresh, &next).unwrap(), sample_map());
    }

    #[test]
    fn writing_with_unsynced_stored_key_rotates_it() {
        let key = SettingsKey::generate();
        let store = Arc::new(MemoryKeyStore::with_key(key.clone()));
        let codec = CryptoSettings::new(store.clone());

        let bytes = write(&codec, &sample_map());
        assert_eq!(nonce_counter(&bytes), 1);

        let rotated = store.current().unwrap();
        assert_ne!(rotated, key);
        let old_key_reader = CryptoSettings::new(Arc::new(MemoryKeyStore::with_key(key)));
        assert!(matches!(read(&old_key_reader, &bytes), Err(SettingsError::DecryptionFailed)));
        let reader = CryptoSettings::new(Arc::new(MemoryKeyStore::with_key(rotated)));
        assert_eq!(read(&reader, &bytes).unwrap(), sample_map());
    }

    #[test]
    fn writing_after_failed_read_rotates_key() {
        let (other, _) = encrypted_codec();
        let foreign = write(&other, &sample_map());

        let key = SettingsKey::generate();
        let store = Arc::new(MemoryKeyStore::with_key(key.clone()));
        let codec = CryptoSettings::new(store.clone());
        assert!(matches!(read(&codec, &foreign), Err(SettingsError::DecryptionFailed)));

        write(&codec, &sample_map());
        assert_ne!(store.current().unwrap(), key);
    }

    #[test]
    fn reading_an_older_file_does_not_rewind_counter() {
        let (codec, store) = encrypted_codec();
        let older = write(&codec, &sample_map());
        let newer = write(&codec, &sample_map());
        let key = store.current().unwrap();

        assert_eq!(read(&codec, &older).unwrap(), sample_map());
        assert_eq!(codec.last_nonce(), nonce_counter(&newer));

        let third = write(&codec, &sample_map());
        assert_eq!(nonce_counter(&third), nonce_counter(&newer) + 1);
        assert_eq!(store.current().unwrap(), key);
    }

    #[test]
    fn key_store_failure_falls_back_to_plaintext() {
        let codec = CryptoSettings::new(Arc::new(BrokenStore));
        assert_eq!(codec.supported_version(), Version::EncryptionChachaPolyV1);

        let mut out = Vec::new();
        let result = codec.write_file(&mut out, &sample_map());
        assert!(matches!(result, Err(SettingsError::KeyUnavailable(_))));
        assert!(out.is_empty());

        assert_eq!(codec.supported_version(), Version::NoEncryption);
        let bytes = write(&codec, &sample_map());
        assert_eq!(bytes[0], 0x00);
        assert_eq!(read(&codec, &bytes).unwrap(), sample_map());
    }

    #[test]
    fn encrypted_file_without_secret_store_is_key_unavailable() {
        let (writer, _) = encrypted_codec();
        let bytes = write(&writer, &sample_map());

        let reader = CryptoSettings::new(Arc::new(MemoryKeyStore::unavailable()));
        assert!(matches!(read(&reader, &bytes), Err(SettingsError::KeyUnavailable(_))));
    }

    #[test]
    fn reset_key_forgets_key_and_counter() {
        let (codec, store) = encrypted_codec();
        let old = write(&codec, &sample_map());
        write(&codec, &sample_map());
        assert!(store.current().is_some());

        codec.reset_key().unwrap();
        assert!(store.current().is_none());
        assert_eq!(codec.last_nonce(), 0);

        let new = write(&codec, &sample_map());
        assert_eq!(nonce_counter(&new), 1);
        assert!(matches!(read(&codec, &old), Err(SettingsError::DecryptionFailed)));
        assert_eq!(read(&codec, &new).unwrap(), sample_map());
    }

    #[test]
    fn successful_reset_after_fallback_restores_encryption() {
        let store = Arc::new(FlakyStore {
            inner: MemoryKeyStore::new(),
            refuse_store: AtomicBool::new(true),
        });
        let codec = CryptoSettings::new(store.clone());

        let mut out = Vec::new();
        assert!(codec.write_file(&mut out, &sample_map()).is_err());
        assert_eq!(codec.supported_version(), Version::NoEncryption);

        store.refuse_store.store(false, Ordering::SeqCst);
        codec.reset_key().unwrap();
        assert_eq!(codec.supported_version(), Version::EncryptionChachaPolyV1);

        let bytes = write(&codec, &sample_map());
        assert_eq!(bytes[0], 0x01);
        assert_eq!(read(&codec, &bytes).unwrap(), sample_map());
    }

    #[test]
    fn reset_key_failure_falls_back_to_plaintext() {
        let codec = CryptoSettings::new(Arc::new(BrokenStore));
        assert!(matches!(codec.reset_key(), Err(SettingsError::KeyUnavailable(_))));
        assert_eq!(codec.supported_version(), Version::NoEncryption);
    }

    #[test]
    fn writer_failure_is_write_error() {
        let (codec, _store) = encrypted_codec();
        let result = codec.write_file(&mut FailingWriter, &sample_map());
        assert!(matches!(result, Err(SettingsError::WriteError(_))));
    }
}
