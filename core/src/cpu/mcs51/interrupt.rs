//! Interrupt flag refresh and dispatch.
//!
//! Five request flags (`IE0`, `TF0`, `IE1`, `TF1`, plus the serial-port flag
//! this crate does not model) feed two priority levels; within a level the
//! fixed order is external-0, timer-0, external-1, timer-1. A pending
//! request is serviced by pushing the return address and jumping to its
//! vector, unless interrupts are globally disabled, the processor already
//! sits inside a same-or-higher priority handler, or the previous
//! instruction was `RETI` (real MCS-51 parts guarantee at least one more
//! instruction always executes between two ISR dispatches).

use super::Mcs51;

const IE_ADDR: u8 = 0xA8;
const IP_ADDR: u8 = 0xB8;
const TCON_ADDR: u8 = 0x88;
const P3_ADDR: u8 = 0xB0;

struct Source {
    pending: u8,
    high_prio: u8,
    vector: u16,
    clear_mask: u8,
}

impl Mcs51 {
    /// Updates `TCON`'s `IE0`/`IE1` request flags from the `INT0`/`INT1`
    /// pins: edge-triggered (`IT0`/`IT1` set) latches on a falling edge,
    /// level-triggered tracks the pin directly (active low).
    pub(super) fn refresh_interrupt_flags(&mut self) {
        let p3 = self.read_direct(P3_ADDR);
        let int0_pin = p3 & 0x04 != 0;
        let int1_pin = p3 & 0x08 != 0;
        let mut tcon = self.read_direct(TCON_ADDR);
        let it0_edge = tcon & 0x01 != 0;
        let it1_edge = tcon & 0x04 != 0;

        if it0_edge {
            if self.int0_latched && !int0_pin {
                tcon |= 0x02; // IE0
            }
        } else if !int0_pin {
            tcon |= 0x02;
        } else {
            tcon &= !0x02;
        }

        if it1_edge {
            if self.int1_latched && !int1_pin {
                tcon |= 0x08; // IE1
            }
        } else if !int1_pin {
            tcon |= 0x08;
        } else {
            tcon &= !0x08;
        }
        self.write_direct(TCON_ADDR, tcon);

        self.int0_latched = int0_pin;
        self.int1_latched = int1_pin;
    }

    /// Evaluates pending requests against `IE`/`IP` and, if one should be
    /// serviced, pushes the return address, jumps to its vector, and
    /// returns `true`. Returns `false` if nothing was dispatched.
    pub(super) fn dispatch_interrupts(&mut self) -> bool {
        if self.just_returned {
            return false;
        }
        let ie = self.read_direct(IE_ADDR);
        if ie & 0x80 == 0 {
            return false; // EA clear
        }
        if self.in_interrupt && self.in_high_prio {
            return false; // nothing preempts a high-priority handler
        }
        let ip = self.read_direct(IP_ADDR);
        let tcon = self.read_direct(TCON_ADDR);

        let sources = [
            Source {
                pending: (ie & 0x01 != 0 && tcon & 0x02 != 0) as u8,
                high_prio: (ip & 0x01 != 0) as u8,
                vector: 0x0003,
                clear_mask: 0x02,
            },
            Source {
                pending: (ie & 0x02 != 0 && tcon & 0x20 != 0) as u8,
                high_prio: (ip & 0x02 != 0) as u8,
                vector: 0x000B,
                clear_mask: 0x20,
            },
            Source {
                pending: (ie & 0x04 != 0 && tcon & 0x08 != 0) as u8,
                high_prio: (ip & 0x04 != 0) as u8,
                vector: 0x0013,
                clear_mask: 0x08,
            },
            Source {
                pending: (ie & 0x08 != 0 && tcon & 0x80 != 0) as u8,
                high_prio: (ip & 0x08 != 0) as u8,
                vector: 0x001B,
                clear_mask: 0x80,
            },
        ];

        for source in sources {
            if source.pending == 0 {
                continue;
            }
            if self.in_interrupt && source.high_prio == 0 {
                continue; // a low-prio handler is already running
            }
            let pc = self.pc;
            self.push16(pc);
            self.pc = source.vector;
            self.in_interrupt = true;
            self.in_high_prio = source.high_prio != 0;
            // Timer flags are always hardware-cleared on dispatch; the
            // externals only clear here when edge-latched (level-triggered
            // flags simply continue tracking the pin).
            if source.vector == 0x000B || source.vector == 0x001B {
                let tcon = self.read_direct(TCON_ADDR);
                self.write_direct(TCON_ADDR, tcon & !source.clear_mask);
            } else {
                let edge = (source.vector == 0x0003 && tcon & 0x01 != 0)
                    || (source.vector == 0x0013 && tcon & 0x04 != 0);
                if edge {
                    let tcon = self.read_direct(TCON_ADDR);
                    self.write_direct(TCON_ADDR, tcon & !source.clear_mask);
                }
            }
            return true;
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn low_prio_cannot_preempt_low_prio() {
        let mut cpu = Mcs51::new();
        cpu.write_direct(IE_ADDR, 0x81); // EA | EX0
        cpu.in_interrupt = true;
        cpu.in_high_prio = false;
        cpu.write_direct(TCON_ADDR, 0x02); // IE0 pending
        assert!(!cpu.dispatch_interrupts());
    }

    #[test]
    fn high_prio_preempts_active_low_prio() {
        let mut cpu = Mcs51::new();
        cpu.write_direct(IE_ADDR, 0x83); // EA | EX0 | ET0
        cpu.write_direct(IP_ADDR, 0x02); // T0 is high priority
        cpu.in_interrupt = true;
        cpu.in_high_prio = false;
        cpu.write_direct(TCON_ADDR, 0x20); // TF0 pending
        assert!(cpu.dispatch_interrupts());
        assert_eq!(cpu.pc, 0x000B);
        assert!(cpu.in_high_prio);
    }

    #[test]
    fn reti_cycle_suppresses_redispatch() {
        let mut cpu = Mcs51::new();
        cpu.write_direct(IE_ADDR, 0x81);
        cpu.write_direct(TCON_ADDR, 0x02);
        cpu.just_returned = true;
        assert!(!cpu.dispatch_interrupts());
    }
}
