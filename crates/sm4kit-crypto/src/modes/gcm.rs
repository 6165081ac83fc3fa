//! GCM (Galois/Counter Mode) authenticated encryption over SM4.
//!
//! Implements GCM as defined in NIST SP 800-38D, instantiated with SM4 as
//! in RFC 8998. An [`Sm4Gcm`] context owns the key schedule and the
//! GHASH multiplication table for its hash subkey; both are immutable after
//! construction, so one context serves concurrent callers.

use sm4kit_types::CryptoError;
use subtle::ConstantTimeEq;
use zeroize::{DefaultIsZeroes, Zeroize};

use crate::provider::Aead;
use crate::sm4::{Backend, Sm4Key, SM4_BLOCK_SIZE, SM4_KEY_SIZE};

/// Authentication tag length in bytes.
pub const GCM_TAG_SIZE: usize = 16;

/// Nonce length that takes the direct J0 path.
pub const GCM_NONCE_SIZE: usize = 12;

/// Longest plaintext NIST SP 800-38D allows: 2^39 - 256 bits.
const GCM_MAX_PLAINTEXT: u64 = (1 << 36) - 32;

/// Longest AAD or nonce: 2^64 - 1 bits, rounded down to whole bytes.
const GCM_MAX_AAD: u64 = (1 << 61) - 1;

/// Counter blocks encrypted per backend call.
const CTR_BATCH: usize = 16;

/// The GCM reduction polynomial x^128 + x^7 + x^2 + x + 1, bit-reflected.
const R: u64 = 0xe100000000000000;

// ---------------------------------------------------------------------------
// GF(2^128)
// ---------------------------------------------------------------------------

/// GF(2^128) element as (high, low) u64 pair, in GCM bit order: the most
/// significant bit of the first byte is the coefficient of x^0.
#[derive(Clone, Copy, Default, PartialEq, Eq, Debug)]
pub struct Gf128 {
    h: u64,
    l: u64,
}

impl DefaultIsZeroes for Gf128 {}

impl Gf128 {
    pub const ZERO: Self = Self { h: 0, l: 0 };

    /// The multiplicative identity, 0x80 00 .. 00.
    pub const ONE: Self = Self { h: 1 << 63, l: 0 };

    pub fn from_bytes(b: &[u8; 16]) -> Self {
        let (hi, lo) = b.split_at(8);
        let mut h = [0u8; 8];
        let mut l = [0u8; 8];
        h.copy_from_slice(hi);
        l.copy_from_slice(lo);
        Self {
            h: u64::from_be_bytes(h),
            l: u64::from_be_bytes(l),
        }
    }

    pub fn to_bytes(self) -> [u8; 16] {
        let mut out = [0u8; 16];
        out[..8].copy_from_slice(&self.h.to_be_bytes());
        out[8..].copy_from_slice(&self.l.to_be_bytes());
        out
    }

    #[inline]
    pub fn xor(self, other: Self) -> Self {
        Self {
            h: self.h ^ other.h,
            l: self.l ^ other.l,
        }
    }

    /// Multiply by x: shift toward the low end, reducing on carry-out.
    #[inline]
    fn mul_x(self) -> Self {
        let carry = self.l & 1;
        Self {
            h: (self.h >> 1) ^ (R & carry.wrapping_neg()),
            l: (self.l >> 1) | (self.h << 63),
        }
    }

    /// Reference multiplication: 128 rounds of conditional XOR and shift.
    pub fn mul(self, other: Self) -> Self {
        let mut z = Self::ZERO;
        let mut v = other;
        for word in [self.h, self.l] {
            for i in (0..64).rev() {
                let mask = ((word >> i) & 1).wrapping_neg();
                z.h ^= v.h & mask;
                z.l ^= v.l & mask;
                v = v.mul_x();
            }
        }
        z
    }
}

/// Multiply two field elements given as GCM-ordered byte strings.
pub fn gf_mul(x: &[u8; 16], y: &[u8; 16]) -> [u8; 16] {
    Gf128::from_bytes(x).mul(Gf128::from_bytes(y)).to_bytes()
}

// ---------------------------------------------------------------------------
// GHASH
// ---------------------------------------------------------------------------

/// Precomputed multiplication by a fixed H.
///
/// `table[i][b]` is the product of H and the element whose only non-zero
/// byte is `b` at position `i`, so a full product is 16 lookups XORed.
pub struct GhashTable {
    table: Box<[[Gf128; 256]]>,
}

impl GhashTable {
    pub fn new(h: &[u8; 16]) -> Self {
        let mut table = vec![[Gf128::ZERO; 256]; 16].into_boxed_slice();

        // Single-bit entries: H * x^p for p = 0..128.
        let mut v = Gf128::from_bytes(h);
        for row in table.iter_mut() {
            for bit in 0..8 {
                row[0x80 >> bit] = v;
                v = v.mul_x();
            }
        }

        // Everything else is a sum of single-bit entries.
        for row in table.iter_mut() {
            for b in 2..256usize {
                if !b.is_power_of_two() {
                    let msb = 1 << (usize::BITS - 1 - b.leading_zeros());
                    row[b] = row[msb].xor(row[b ^ msb]);
                }
            }
        }

        v.zeroize();
        Self { table }
    }

    /// Multiply `x` by H.
    pub fn mul(&self, x: Gf128) -> Gf128 {
        x.to_bytes()
            .iter()
            .zip(self.table.iter())
            .fold(Gf128::ZERO, |acc, (&b, row)| acc.xor(row[b as usize]))
    }

    /// The subkey this table multiplies by.
    pub(crate) fn h(&self) -> Gf128 {
        self.table[0][0x80]
    }

    /// GHASH step: state = (state XOR block) * H.
    pub(crate) fn ghash_block(&self, state: &mut Gf128, block: &[u8; 16]) {
        *state = self.mul(state.xor(Gf128::from_bytes(block)));
    }

    /// GHASH over variable-length data (pad to block boundary).
    pub(crate) fn ghash_data(&self, state: &mut Gf128, data: &[u8]) {
        for chunk in data.chunks(16) {
            let mut block = [0u8; 16];
            block[..chunk.len()].copy_from_slice(chunk);
            self.ghash_block(state, &block);
        }
    }
}

impl Drop for GhashTable {
    fn drop(&mut self) {
        for row in self.table.iter_mut() {
            row.zeroize();
        }
    }
}

/// Big-endian bit lengths of two inputs, as the final GHASH block.
fn length_block(a_len: usize, c_len: usize) -> [u8; 16] {
    let mut block = [0u8; 16];
    block[..8].copy_from_slice(&((a_len as u64) * 8).to_be_bytes());
    block[8..].copy_from_slice(&((c_len as u64) * 8).to_be_bytes());
    block
}

/// Increment the last 4 bytes of a 16-byte counter (big-endian INC32).
fn inc32(counter: &mut [u8; 16]) {
    let ctr =
        u32::from_be_bytes([counter[12], counter[13], counter[14], counter[15]]).wrapping_add(1);
    counter[12..16].copy_from_slice(&ctr.to_be_bytes());
}

// ---------------------------------------------------------------------------
// SM4-GCM context
// ---------------------------------------------------------------------------

/// SM4-GCM with a fixed key.
pub struct Sm4Gcm {
    cipher: Sm4Key,
    table: GhashTable,
}

impl Sm4Gcm {
    /// Create a context using the preferred SM4 backend.
    pub fn new(key: &[u8]) -> Result<Self, CryptoError> {
        Ok(Self::from_cipher(Sm4Key::new(key)?))
    }

    /// Create a context bound to a specific SM4 backend.
    pub fn with_backend(key: &[u8], backend: Backend) -> Result<Self, CryptoError> {
        Ok(Self::from_cipher(Sm4Key::with_backend(key, backend)?))
    }

    /// Wrap an existing key schedule; derives H = E_K(0^128).
    pub fn from_cipher(cipher: Sm4Key) -> Self {
        let mut h = [[0u8; SM4_BLOCK_SIZE]; 1];
        cipher.encrypt_blocks(&mut h);
        let table = GhashTable::new(&h[0]);
        h.zeroize();
        Sm4Gcm { cipher, table }
    }

    pub fn backend(&self) -> Backend {
        self.cipher.backend()
    }

    /// Encrypt `plaintext`, returning the ciphertext and tag.
    pub fn encrypt(
        &self,
        nonce: &[u8],
        aad: &[u8],
        plaintext: &[u8],
    ) -> Result<(Vec<u8>, [u8; GCM_TAG_SIZE]), CryptoError> {
        let mut ct = vec![0u8; plaintext.len()];
        let tag = self.encrypt_into(nonce, aad, plaintext, &mut ct)?;
        Ok((ct, tag))
    }

    /// Encrypt into `out`, which must hold at least `plaintext.len()` bytes.
    /// Only the first `plaintext.len()` bytes are written.
    pub fn encrypt_into(
        &self,
        nonce: &[u8],
        aad: &[u8],
        plaintext: &[u8],
        out: &mut [u8],
    ) -> Result<[u8; GCM_TAG_SIZE], CryptoError> {
        check_lengths(nonce, aad, plaintext, out)?;
        let j0 = self.derive_j0(nonce);
        let ct = &mut out[..plaintext.len()];
        self.ctr_xor(&j0, plaintext, ct);
        Ok(self.compute_tag(&j0, aad, ct))
    }

    /// Verify `tag` and decrypt `ciphertext`.
    ///
    /// No plaintext is produced unless the tag matches.
    pub fn decrypt(
        &self,
        nonce: &[u8],
        aad: &[u8],
        ciphertext: &[u8],
        tag: &[u8],
    ) -> Result<Vec<u8>, CryptoError> {
        let mut pt = vec![0u8; ciphertext.len()];
        self.decrypt_into(nonce, aad, ciphertext, tag, &mut pt)?;
        Ok(pt)
    }

    /// Verify `tag` and decrypt into `out`.
    ///
    /// On [`CryptoError::AeadTagVerifyFail`] the whole of `out` is zeroed.
    pub fn decrypt_into(
        &self,
        nonce: &[u8],
        aad: &[u8],
        ciphertext: &[u8],
        tag: &[u8],
        out: &mut [u8],
    ) -> Result<(), CryptoError> {
        if tag.len() != GCM_TAG_SIZE {
            return Err(CryptoError::InvalidTagLength);
        }
        check_lengths(nonce, aad, ciphertext, out)?;

        let j0 = self.derive_j0(nonce);
        let mut computed = self.compute_tag(&j0, aad, ciphertext);
        let ok = bool::from(computed[..].ct_eq(tag));
        computed.zeroize();
        if !ok {
            out.zeroize();
            log::debug!("sm4-gcm: tag mismatch on {} byte message", ciphertext.len());
            return Err(CryptoError::AeadTagVerifyFail);
        }

        self.ctr_xor(&j0, ciphertext, &mut out[..ciphertext.len()]);
        Ok(())
    }

    /// J0 = nonce || 0^31 || 1 for 96-bit nonces, else GHASH of the padded
    /// nonce and its bit length.
    fn derive_j0(&self, nonce: &[u8]) -> [u8; 16] {
        if nonce.len() == GCM_NONCE_SIZE {
            let mut j0 = [0u8; 16];
            j0[..GCM_NONCE_SIZE].copy_from_slice(nonce);
            j0[15] = 1;
            return j0;
        }
        let mut state = Gf128::ZERO;
        self.table.ghash_data(&mut state, nonce);
        self.table.ghash_block(&mut state, &length_block(0, nonce.len()));
        state.to_bytes()
    }

    /// Counter-mode keystream from inc32(J0), XORed into `output`.
    fn ctr_xor(&self, j0: &[u8; 16], input: &[u8], output: &mut [u8]) {
        const CHUNK: usize = CTR_BATCH * SM4_BLOCK_SIZE;

        let mut counter = *j0;
        inc32(&mut counter);
        let mut keystream = [[0u8; SM4_BLOCK_SIZE]; CTR_BATCH];

        for (src, dst) in input.chunks(CHUNK).zip(output.chunks_mut(CHUNK)) {
            let n = src.len().div_ceil(SM4_BLOCK_SIZE);
            for ks in keystream[..n].iter_mut() {
                *ks = counter;
                inc32(&mut counter);
            }
            self.cipher.encrypt_blocks(&mut keystream[..n]);
            for ((d, &s), &k) in dst.iter_mut().zip(src).zip(keystream.as_flattened()) {
                *d = s ^ k;
            }
        }

        keystream.zeroize();
    }

    /// Tag = E_K(J0) XOR GHASH(A || C || lengths).
    fn compute_tag(&self, j0: &[u8; 16], aad: &[u8], ciphertext: &[u8]) -> [u8; GCM_TAG_SIZE] {
        let mut state = Gf128::ZERO;
        self.table.ghash_data(&mut state, aad);
        self.table.ghash_data(&mut state, ciphertext);
        self.table
            .ghash_block(&mut state, &length_block(aad.len(), ciphertext.len()));

        let mut ek0 = [*j0];
        self.cipher.encrypt_blocks(&mut ek0);
        let mut tag = state.to_bytes();
        for (t, &e) in tag.iter_mut().zip(ek0[0].iter()) {
            *t ^= e;
        }
        state.zeroize();
        ek0.zeroize();
        tag
    }

    #[cfg(test)]
    fn hash_subkey(&self) -> [u8; 16] {
        self.table.h().to_bytes()
    }
}

fn check_lengths(
    nonce: &[u8],
    aad: &[u8],
    input: &[u8],
    out: &[u8],
) -> Result<(), CryptoError> {
    if nonce.is_empty() || nonce.len() as u64 > GCM_MAX_AAD {
        return Err(CryptoError::InvalidIvLength);
    }
    if input.len() as u64 > GCM_MAX_PLAINTEXT || aad.len() as u64 > GCM_MAX_AAD {
        return Err(CryptoError::InputOverflow);
    }
    if out.len() < input.len() {
        return Err(CryptoError::BufferTooSmall {
            need: input.len(),
            got: out.len(),
        });
    }
    Ok(())
}

impl Aead for Sm4Gcm {
    fn tag_size(&self) -> usize {
        GCM_TAG_SIZE
    }

    fn nonce_size(&self) -> usize {
        GCM_NONCE_SIZE
    }

    fn key_size(&self) -> usize {
        SM4_KEY_SIZE
    }

    fn set_key(&mut self, key: &[u8]) -> Result<(), CryptoError> {
        *self = Self::with_backend(key, self.backend())?;
        Ok(())
    }

    fn encrypt(&self, nonce: &[u8], aad: &[u8], plaintext: &[u8]) -> Result<Vec<u8>, CryptoError> {
        let (mut ct, tag) = Sm4Gcm::encrypt(self, nonce, aad, plaintext)?;
        ct.extend_from_slice(&tag);
        Ok(ct)
    }

    fn decrypt(&self, nonce: &[u8], aad: &[u8], ciphertext: &[u8]) -> Result<Vec<u8>, CryptoError> {
        let ct_len = ciphertext
            .len()
            .checked_sub(GCM_TAG_SIZE)
            .ok_or(CryptoError::InvalidArg)?;
        let (ct, tag) = ciphertext.split_at(ct_len);
        Sm4Gcm::decrypt(self, nonce, aad, ct, tag)
    }
}

/// Encrypt and authenticate data using SM4-GCM.
/// Returns ciphertext || 16-byte tag.
pub fn sm4_gcm_encrypt(
    key: &[u8],
    nonce: &[u8],
    aad: &[u8],
    plaintext: &[u8],
) -> Result<Vec<u8>, CryptoError> {
    Aead::encrypt(&Sm4Gcm::new(key)?, nonce, aad, plaintext)
}

/// Decrypt and verify data using SM4-GCM.
/// `ciphertext` includes the appended 16-byte tag.
/// Returns plaintext on success, or error if authentication fails.
pub fn sm4_gcm_decrypt(
    key: &[u8],
    nonce: &[u8],
    aad: &[u8],
    ciphertext: &[u8],
) -> Result<Vec<u8>, CryptoError> {
    if ciphertext.len() < GCM_TAG_SIZE {
        return Err(CryptoError::InvalidArg);
    }
    Aead::decrypt(&Sm4Gcm::new(key)?, nonce, aad, ciphertext)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hex_to_bytes(s: &str) -> Vec<u8> {
        (0..s.len())
            .step_by(2)
            .map(|i| u8::from_str_radix(&s[i..i + 2], 16).unwrap())
            .collect()
    }

    fn hex(bytes: &[u8]) -> String {
        bytes.iter().map(|b| format!("{b:02x}")).collect()
    }

    fn block(s: &str) -> [u8; 16] {
        hex_to_bytes(s).try_into().unwrap()
    }

    const KEY: &str = "0123456789abcdeffedcba9876543210";
    const IV: &str = "00001234567800000000abcd";
    const AAD: &str = "feedfacedeadbeeffeedfacedeadbeefabaddad2";
    const PT: &str = "aaaaaaaaaaaaaaaabbbbbbbbbbbbbbbbccccccccccccccccdddddddddddddddd\
                      eeeeeeeeeeeeeeeeffffffffffffffffeeeeeeeeeeeeeeeeaaaaaaaaaaaaaaaa";

    fn xorshift_block(state: &mut u64) -> [u8; 16] {
        core::array::from_fn(|_| {
            *state ^= *state << 13;
            *state ^= *state >> 7;
            *state ^= *state << 17;
            *state as u8
        })
    }

    // ---- GF(2^128) ----

    #[test]
    fn test_gf_mul_known_product() {
        let h = block("66e94bd4ef8a2c3b884cfa59ca342b2e");
        let x = block("0388dace60b6a392f328c2b971b2fe78");
        let expected = "5e2ec746917062882c85b0685353deb7";
        assert_eq!(hex(&gf_mul(&x, &h)), expected);
        assert_eq!(hex(&gf_mul(&h, &x)), expected);
        let table = GhashTable::new(&h);
        assert_eq!(hex(&table.mul(Gf128::from_bytes(&x)).to_bytes()), expected);
    }

    #[test]
    fn test_gf_mul_identity_and_zero() {
        let h = block("2677f46b09c122cc975533105bd4a22a");
        let hg = Gf128::from_bytes(&h);
        assert_eq!(Gf128::ONE.mul(hg), hg);
        assert_eq!(hg.mul(Gf128::ONE), hg);
        assert_eq!(Gf128::ZERO.mul(hg), Gf128::ZERO);

        let table = GhashTable::new(&h);
        assert_eq!(table.mul(Gf128::ONE), hg);
        assert_eq!(table.mul(Gf128::ZERO), Gf128::ZERO);
        assert_eq!(table.h(), hg);
    }

    #[test]
    fn test_table_mul_matches_reference() {
        let mut seed = 0x0123_4567_89ab_cdefu64;
        for _ in 0..8 {
            let h = xorshift_block(&mut seed);
            let table = GhashTable::new(&h);
            let hg = Gf128::from_bytes(&h);
            for _ in 0..32 {
                let x = Gf128::from_bytes(&xorshift_block(&mut seed));
                assert_eq!(table.mul(x), x.mul(hg));
            }
        }
    }

    #[test]
    fn test_inc32_wraps_low_word_only() {
        let mut c = block("000000000000000000000000ffffffff");
        inc32(&mut c);
        assert_eq!(hex(&c), "00000000000000000000000000000000");
        let mut c = block("0000000000000000000000ff00000001");
        inc32(&mut c);
        assert_eq!(hex(&c), "0000000000000000000000ff00000002");
    }

    // ---- SM4-GCM vectors ----

    // RFC 8998 Appendix A.1
    #[test]
    fn test_sm4_gcm_rfc8998() {
        let gcm = Sm4Gcm::new(&hex_to_bytes(KEY)).unwrap();
        assert_eq!(hex(&gcm.hash_subkey()), "2677f46b09c122cc975533105bd4a22a");

        let pt = hex_to_bytes(PT);
        let (ct, tag) = gcm
            .encrypt(&hex_to_bytes(IV), &hex_to_bytes(AAD), &pt)
            .unwrap();
        assert_eq!(
            hex(&ct),
            "17f399f08c67d5ee19d0dc9969c4bb7d5fd46fd3756489069157b282bb200735\
             d82710ca5c22f0ccfa7cbf93d496ac15a56834cbcf98c397b4024a2691233b8d"
        );
        assert_eq!(hex(&tag), "83de3541e4c2b58177e065a9bf7b62ec");

        let decrypted = gcm
            .decrypt(&hex_to_bytes(IV), &hex_to_bytes(AAD), &ct, &tag)
            .unwrap();
        assert_eq!(decrypted, pt);
    }

    #[test]
    fn test_sm4_gcm_short_nonce() {
        let gcm = Sm4Gcm::new(&hex_to_bytes(KEY)).unwrap();
        let pt = &hex_to_bytes(PT)[..60];
        let nonce = hex_to_bytes("cafebabefacedbad");
        let (ct, tag) = gcm.encrypt(&nonce, &hex_to_bytes(AAD), pt).unwrap();
        assert_eq!(
            hex(&ct),
            "66ebb578395b3063097d2609c0aa2c3e4452aa665b7bf8d9282d26cba3647a68\
             b82e34b49d8142c4a6cb7ea05de007a9a402e20cddccab29b37324dc"
        );
        assert_eq!(hex(&tag), "51d5c21e78d126042c3559cd5fb2d735");
        assert_eq!(
            gcm.decrypt(&nonce, &hex_to_bytes(AAD), &ct, &tag).unwrap(),
            pt
        );
    }

    #[test]
    fn test_sm4_gcm_long_nonce() {
        let gcm = Sm4Gcm::new(&hex_to_bytes(KEY)).unwrap();
        let pt = &hex_to_bytes(PT)[..60];
        let nonce = hex_to_bytes(
            "9313225df88406e555909c5aff5269aa6a7a9538534f7da1e4c303d2a318a728\
             c3c0c95156809539fcf0e2429a6b525416aedbf5a0de6a57a637b39b",
        );
        let (ct, tag) = gcm.encrypt(&nonce, &hex_to_bytes(AAD), pt).unwrap();
        assert_eq!(
            hex(&ct),
            "941e0a953e85df307350999c5154f286d2783d6801ea1a36c83c95a3b9ebaf02\
             3714cfba748bd51c73e8651e1767e1ea71f80bc1bf156ab5e4373d26"
        );
        assert_eq!(hex(&tag), "66eb74c437bab54abb83e5ef78a7f627");
    }

    #[test]
    fn test_sm4_gcm_empty_plaintext() {
        let gcm = Sm4Gcm::new(&hex_to_bytes(KEY)).unwrap();
        let iv = hex_to_bytes(IV);

        let (ct, tag) = gcm.encrypt(&iv, &hex_to_bytes(AAD), &[]).unwrap();
        assert!(ct.is_empty());
        assert_eq!(hex(&tag), "63aa7895a55f35dd693ea9e3f98bf3ff");
        assert!(gcm
            .decrypt(&iv, &hex_to_bytes(AAD), &[], &tag)
            .unwrap()
            .is_empty());

        let (_, tag) = gcm.encrypt(&iv, &[], &[]).unwrap();
        assert_eq!(hex(&tag), "54f157af32744bb83bbe8aa6f1578b71");
    }

    #[test]
    fn test_sm4_gcm_backends_agree() {
        let key = hex_to_bytes(KEY);
        let pt: Vec<u8> = (0..1000u32).map(|i| (i * 7 + 3) as u8).collect();
        let reference = Sm4Gcm::with_backend(&key, Backend::Basic).unwrap();
        let (ct_ref, tag_ref) = reference.encrypt(&hex_to_bytes(IV), b"hdr", &pt).unwrap();
        for backend in Backend::supported() {
            let gcm = Sm4Gcm::with_backend(&key, backend).unwrap();
            assert_eq!(gcm.backend(), backend);
            let (ct, tag) = gcm.encrypt(&hex_to_bytes(IV), b"hdr", &pt).unwrap();
            assert_eq!(ct, ct_ref, "{backend}");
            assert_eq!(tag, tag_ref, "{backend}");
        }
    }

    #[test]
    fn test_sm4_gcm_counter_wrap() {
        // J0 low word ffffffff: the first data counter wraps to 0.
        let gcm = Sm4Gcm::new(&[9u8; 16]).unwrap();
        let nonce = [0xffu8; 12];
        let pt = vec![0x5au8; 100];
        let (ct, tag) = gcm.encrypt(&nonce, &[], &pt).unwrap();
        assert_eq!(gcm.decrypt(&nonce, &[], &ct, &tag).unwrap(), pt);
    }

    // ---- failure behaviour ----

    #[test]
    fn test_sm4_gcm_tamper_detected() {
        let gcm = Sm4Gcm::new(&[0x42u8; 16]).unwrap();
        let nonce = [0x01u8; 12];
        let aad = b"header".to_vec();
        let pt = b"hello SM4-GCM authenticated encryption".to_vec();
        let (ct, tag) = gcm.encrypt(&nonce, &aad, &pt).unwrap();

        let mut bad_tag = tag;
        bad_tag[15] ^= 0x01;
        assert_eq!(
            gcm.decrypt(&nonce, &aad, &ct, &bad_tag).unwrap_err(),
            CryptoError::AeadTagVerifyFail
        );

        let mut bad_ct = ct.clone();
        bad_ct[0] ^= 0x80;
        assert!(gcm.decrypt(&nonce, &aad, &bad_ct, &tag).is_err());

        let mut bad_aad = aad.clone();
        bad_aad[5] ^= 0x04;
        assert!(gcm.decrypt(&nonce, &bad_aad, &ct, &tag).is_err());

        let mut bad_nonce = nonce;
        bad_nonce[11] ^= 1;
        assert!(gcm.decrypt(&bad_nonce, &aad, &ct, &tag).is_err());
    }

    #[test]
    fn test_sm4_gcm_decrypt_into_clears_output() {
        let gcm = Sm4Gcm::new(&[0x42u8; 16]).unwrap();
        let nonce = [0x01u8; 12];
        let (ct, mut tag) = gcm.encrypt(&nonce, &[], b"secret message").unwrap();
        tag[0] ^= 1;
        let mut out = vec![0xeeu8; 32];
        let err = gcm.decrypt_into(&nonce, &[], &ct, &tag, &mut out);
        assert_eq!(err, Err(CryptoError::AeadTagVerifyFail));
        assert!(out.iter().all(|&b| b == 0));
    }

    #[test]
    fn test_sm4_gcm_into_buffers() {
        let gcm = Sm4Gcm::new(&[3u8; 16]).unwrap();
        let nonce = [7u8; 12];
        let pt = [0x11u8; 40];
        let mut ct = [0u8; 48];
        let tag = gcm.encrypt_into(&nonce, b"a", &pt, &mut ct).unwrap();
        assert_eq!(&ct[40..], &[0u8; 8]);

        let mut short = [0u8; 39];
        assert_eq!(
            gcm.encrypt_into(&nonce, b"a", &pt, &mut short),
            Err(CryptoError::BufferTooSmall { need: 40, got: 39 })
        );

        let mut back = [0u8; 40];
        gcm.decrypt_into(&nonce, b"a", &ct[..40], &tag, &mut back)
            .unwrap();
        assert_eq!(back, pt);
    }

    #[test]
    fn test_sm4_gcm_malformed_inputs() {
        let gcm = Sm4Gcm::new(&[0u8; 16]).unwrap();
        assert_eq!(
            gcm.encrypt(&[], &[], b"x").unwrap_err(),
            CryptoError::InvalidIvLength
        );
        assert_eq!(
            gcm.decrypt(&[0u8; 12], &[], b"x", &[0u8; 15]).unwrap_err(),
            CryptoError::InvalidTagLength
        );
        assert_eq!(
            gcm.decrypt(&[0u8; 12], &[], b"x", &[0u8; 17]).unwrap_err(),
            CryptoError::InvalidTagLength
        );
        assert!(matches!(
            Sm4Gcm::new(&[0u8; 8]),
            Err(CryptoError::InvalidKeyLength { .. })
        ));
    }

    // ---- trait and one-shot API ----

    #[test]
    fn test_sm4_gcm_encrypt_decrypt_roundtrip() {
        let key = [0x42u8; 16];
        let nonce = [0x01u8; 12];
        let aad = b"additional data";
        let plaintext = b"hello SM4-GCM authenticated encryption";

        let ct = sm4_gcm_encrypt(&key, &nonce, aad, plaintext).unwrap();
        assert_eq!(ct.len(), plaintext.len() + 16);

        let pt = sm4_gcm_decrypt(&key, &nonce, aad, &ct).unwrap();
        assert_eq!(pt, plaintext);
    }

    #[test]
    fn test_sm4_gcm_tampered_tag() {
        let key = [0x42u8; 16];
        let nonce = [0x01u8; 12];
        let plaintext = b"secret message";

        let mut ct = sm4_gcm_encrypt(&key, &nonce, &[], plaintext).unwrap();
        let len = ct.len();
        ct[len - 1] ^= 0x01;
        assert!(sm4_gcm_decrypt(&key, &nonce, &[], &ct).is_err());
    }

    #[test]
    fn test_sm4_gcm_short_ciphertext() {
        let key = [0u8; 16];
        let nonce = [0u8; 12];
        assert_eq!(
            sm4_gcm_decrypt(&key, &nonce, &[], &[0u8; 15]).unwrap_err(),
            CryptoError::InvalidArg
        );
    }

    #[test]
    fn test_sm4_gcm_aead_trait() {
        let mut gcm = Sm4Gcm::with_backend(&[0u8; 16], Backend::Table).unwrap();
        let aead: &mut dyn Aead = &mut gcm;
        assert_eq!(aead.tag_size(), 16);
        assert_eq!(aead.nonce_size(), 12);
        assert_eq!(aead.key_size(), 16);
        aead.set_key(&hex_to_bytes(KEY)).unwrap();

        let sealed = aead
            .encrypt(&hex_to_bytes(IV), &hex_to_bytes(AAD), &hex_to_bytes(PT))
            .unwrap();
        assert_eq!(hex(&sealed[64..]), "83de3541e4c2b58177e065a9bf7b62ec");
        assert_eq!(
            aead.decrypt(&hex_to_bytes(IV), &hex_to_bytes(AAD), &sealed)
                .unwrap(),
            hex_to_bytes(PT)
        );
        assert_eq!(gcm.backend(), Backend::Table);
    }
}
