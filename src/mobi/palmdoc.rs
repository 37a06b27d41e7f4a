//! PalmDOC LZ77 decompression.
//!
//! The compression scheme is simple:
//! - Bytes 0x01-0x08: Copy next 'n' bytes literally
//! - Bytes 0x00, 0x09-0x7F: Literal character
//! - Bytes 0x80-0xBF: Back-reference (LZ77)
//!   - Combined with next byte: distance = (val & 0x3FFF) >> 3, length = (val & 7) + 3
//! - Bytes 0xC0-0xFF: Space + (byte ^ 0x80)

pub fn decompress(input: &[u8]) -> Vec<u8> {
    let mut output = Vec::with_capacity(input.len() * 4);
    let mut i = 0;

    while i < input.len() {
        let c = input[i];
        i += 1;

        if (1..=8).contains(&c) {
            // Copy next 'c' bytes literally
            let count = c as usize;
            for _ in 0..count {
                if i < input.len() {
                    output.push(input[i]);
                    i += 1;
                }
            }
        } else if c == 0 || (0x09..=0x7F).contains(&c) {
            // Literal character
            output.push(c);
        } else if c >= 0xC0 {
            // Space + ASCII char
            output.push(b' ');
            output.push(c ^ 0x80);
        } else if i < input.len() {
            // Back-reference (0x80-0xBF)
            let next = input[i];
            i += 1;

            let combined = ((c as u16) << 8) | (next as u16);
            let distance = ((combined & 0x3FFF) >> 3) as usize;
            let length = ((combined & 7) + 3) as usize;

            if distance > 0 && distance <= output.len() {
                for _ in 0..length {
                    let pos = output.len() - distance;
                    let byte = output[pos];
                    output.push(byte);
                }
            }
        }
    }

    output
}
