use mcs51_core::cpu::mcs51::Mcs51;

/// Loads `bytes` into ROM at `addr` through a one-off Intel HEX string; the
/// processor only exposes ROM writes through `load_hex`, so every
/// integration test builds its program this way instead of poking `rom`
/// directly.
pub fn load(cpu: &mut Mcs51, addr: u16, bytes: &[u8]) {
    let mut out = String::new();
    let mut offset = 0usize;
    while offset < bytes.len() {
        let chunk_len = (bytes.len() - offset).min(16);
        let chunk = &bytes[offset..offset + chunk_len];
        let record_addr = addr.wrapping_add(offset as u16);
        let mut sum: u32 = chunk_len as u32 + (record_addr >> 8) as u32 + (record_addr & 0xFF) as u32;
        out.push(':');
        out.push_str(&format!("{chunk_len:02x}{record_addr:04x}00"));
        for byte in chunk {
            out.push_str(&format!("{byte:02x}"));
            sum += *byte as u32;
        }
        let checksum = (!(sum as u8)).wrapping_add(1);
        out.push_str(&format!("{checksum:02x}\n"));
        offset += chunk_len;
    }
    out.push_str(":00000001FF\n");
    cpu.load_hex(&out).expect("well-formed HEX from test helper");
}

/// Runs `n` instructions. `do_cycle` executes exactly one instruction (plus
/// peripheral housekeeping) per call, so this is instructions, not raw
/// machine cycles.
pub fn run(cpu: &mut Mcs51, n: usize) {
    for _ in 0..n {
        cpu.do_cycle();
    }
}
