//! Ogg page checksum.
//!
//! CRC-32 with polynomial 0x04C11DB7, initial value 0, no bit reflection
//! and no final XOR, computed over the page with its CRC field zeroed.

static CRC_TABLE: [u32; 256] = {
    let mut table = [0u32; 256];
    let mut i = 0;
    while i < 256 {
        let mut r = (i as u32) << 24;
        let mut j = 0;
        while j < 8 {
            if r & 0x8000_0000 != 0 {
                r = (r << 1) ^ 0x04c1_1db7;
            } else {
                r <<= 1;
            }
            j += 1;
        }
        table[i] = r;
        i += 1;
    }
    table
};

/// Continues a running checksum over `data`.
pub fn update(mut crc: u32, data: &[u8]) -> u32 {
    for &byte in data {
        crc = (crc << 8) ^ CRC_TABLE[((crc >> 24) as u8 ^ byte) as usize];
    }
    crc
}

/// Computes the checksum of `data`.
pub fn crc32(data: &[u8]) -> u32 {
    update(0, data)
}
