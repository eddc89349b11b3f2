// This file is part of cobalt64.
// Copyright (c) 2019-2022 The cobalt64 authors. All rights reserved.
// Licensed under the GPLv3. See LICENSE file in the project root for full license text.

use std::fmt;
use std::sync::Once;

use log::Level;

use crate::factory::{Addressable, Cpu, Register};
use crate::util::{IoPort, IrqLine, Pin, Shared, StateReader, StateWriter};
use crate::Error;

use super::uops::{decode, validate_program_table, Exec, MicroOp, Step, FETCH_PROGRAM, IRQ_PROGRAM};

// Spec: http://nesdev.com/6502.txt
// Design:
//   Execution advances one clock cycle at a time. The CPU keeps a cursor
//   into the micro-instruction program of the opcode in flight; each
//   step_cycle() invocation performs the bus transaction and data-path work
//   of one step and moves the cursor. When a program runs out, the cursor
//   returns to the shared fetch step, which decodes the next opcode or
//   diverts into the interrupt sequence.
//
//   Interrupt inputs go through detectors with a one-cycle delay: a level
//   detector for IRQ and an edge latch for NMI. Most instructions sample
//   the detectors in their final cycle (POLL_INT); the fetch step then acts
//   on the latched result. This reproduces the delayed interrupt pickup and
//   the BRK hijacking behavior of the real part.
//
//   The 6510 on-chip port lives at 0x0000/0x0001 and controls the PLA, so
//   it is handled here. The drive CPU instantiates the same core without a
//   port.

enum Flag {
    Carry = 1,
    Zero = 1 << 1,
    IntDisable = 1 << 2,
    Decimal = 1 << 3,
    Break = 1 << 4,
    Reserved = 1 << 5,
    Overflow = 1 << 6,
    Negative = 1 << 7,
}

struct Registers {
    a: u8,
    x: u8,
    y: u8,
    sp: u8,
    pc: u16,
    p: u8,
}

impl Registers {
    pub fn new() -> Self {
        Self {
            a: 0,
            x: 0,
            y: 0,
            sp: 0,
            pc: 0,
            p: 0,
        }
    }

    pub fn reset(&mut self) {
        self.a = 0;
        self.x = 0;
        self.y = 0;
        self.sp = 0xfd;
        self.pc = 0;
        self.p = Flag::IntDisable as u8 | Flag::Reserved as u8;
    }
}

enum Flow {
    Advance,
    Done,
    DoneNoPoll,
    Stay,
}

static VALIDATE: Once = Once::new();

pub struct Cpu6510 {
    // Dependencies
    mem: Shared<dyn Addressable>,
    // Runtime state
    regs: Registers,
    program: &'static [Step],
    step_idx: usize,
    opcode: u8,
    in_interrupt: bool,
    // Scratch registers, undefined at instruction boundaries
    addr_lo: u8,
    addr_hi: u8,
    ptr: u8,
    data: u8,
    fixup: bool,
    crossed: bool,
    branch_back: bool,
    int_vector: u16,
    // Interrupt detectors
    irq_level_cur: bool,
    irq_level_del: bool,
    nmi_edge_cur: bool,
    nmi_edge_del: bool,
    nmi_last: bool,
    do_irq: bool,
    do_nmi: bool,
    jammed: bool,
    // I/O
    ba_line: Shared<Pin>,
    io_port: Option<Shared<IoPort>>,
    irq_line: Shared<IrqLine>,
    nmi_line: Shared<IrqLine>,
}

impl Cpu6510 {
    pub fn new(
        mem: Shared<dyn Addressable>,
        io_port: Option<Shared<IoPort>>,
        ba_line: Shared<Pin>,
        irq_line: Shared<IrqLine>,
        nmi_line: Shared<IrqLine>,
    ) -> Self {
        VALIDATE.call_once(|| {
            if let Err(msg) = validate_program_table() {
                panic!("corrupted micro-step table: {}", msg);
            }
        });
        Self {
            mem,
            regs: Registers::new(),
            program: FETCH_PROGRAM,
            step_idx: 0,
            opcode: 0,
            in_interrupt: false,
            addr_lo: 0,
            addr_hi: 0,
            ptr: 0,
            data: 0,
            fixup: false,
            crossed: false,
            branch_back: false,
            int_vector: 0xfffe,
            irq_level_cur: false,
            irq_level_del: false,
            nmi_edge_cur: false,
            nmi_edge_del: false,
            nmi_last: false,
            do_irq: false,
            do_nmi: false,
            jammed: false,
            ba_line,
            io_port,
            irq_line,
            nmi_line,
        }
    }

    #[inline]
    fn addr(&self) -> u16 {
        (u16::from(self.addr_hi) << 8) | u16::from(self.addr_lo)
    }

    // -- Bus ops

    fn bus_read(&self, address: u16) -> u8 {
        match (address, &self.io_port) {
            (0x0000, Some(port)) => port.borrow().get_direction(),
            (0x0001, Some(port)) => port.borrow().get_value() & 0x3f,
            _ => self.mem.borrow().read(address),
        }
    }

    fn bus_write(&mut self, address: u16, value: u8) {
        if let Some(ref port) = self.io_port {
            match address {
                0x0000 => port.borrow_mut().set_direction(value),
                0x0001 => port.borrow_mut().set_value(value),
                _ => {}
            }
        }
        self.mem.borrow_mut().write(address, value);
    }

    fn fetch_byte(&mut self) -> u8 {
        let byte = self.bus_read(self.regs.pc);
        self.regs.pc = self.regs.pc.wrapping_add(1);
        byte
    }

    fn push(&mut self, value: u8) {
        let addr = 0x0100 + u16::from(self.regs.sp);
        self.regs.sp = self.regs.sp.wrapping_sub(1);
        self.bus_write(addr, value);
    }

    fn pop(&mut self) -> u8 {
        self.regs.sp = self.regs.sp.wrapping_add(1);
        self.bus_read(0x0100 + u16::from(self.regs.sp))
    }

    // -- Flags

    fn set_flag(&mut self, flag: Flag, value: bool) {
        if value {
            self.regs.p |= flag as u8;
        } else {
            self.regs.p &= !(flag as u8);
        }
    }

    fn test_flag(&self, flag: Flag) -> bool {
        (self.regs.p & (flag as u8)) != 0
    }

    fn update_nz(&mut self, value: u8) {
        self.set_flag(Flag::Negative, value & 0x80 != 0);
        self.set_flag(Flag::Zero, value == 0);
    }

    // -- Interrupt detectors

    fn update_detectors(&mut self) {
        self.irq_level_del = self.irq_level_cur;
        self.irq_level_cur = self.irq_line.borrow().is_low();
        self.nmi_edge_del = self.nmi_edge_cur;
        let nmi_now = self.nmi_line.borrow().is_low();
        if nmi_now && !self.nmi_last {
            self.nmi_edge_cur = true;
        }
        self.nmi_last = nmi_now;
    }

    fn poll_int(&mut self) {
        if self.irq_level_del && !self.test_flag(Flag::IntDisable) {
            self.do_irq = true;
        }
        if self.nmi_edge_del {
            self.do_nmi = true;
        }
    }

    fn clear_nmi_edge(&mut self) {
        self.nmi_edge_cur = false;
        self.nmi_edge_del = false;
    }

    // -- Micro-step execution

    fn run_step(&mut self, step: Step) -> Flow {
        match step.uop {
            MicroOp::FetchOpcode => {
                if self.do_nmi {
                    let _ = self.bus_read(self.regs.pc);
                    self.clear_nmi_edge();
                    self.do_nmi = false;
                    // NMI wins over a simultaneously pending IRQ
                    self.do_irq = false;
                    self.int_vector = 0xfffa;
                    self.in_interrupt = true;
                    self.program = IRQ_PROGRAM;
                    self.step_idx = 0;
                    return Flow::Stay;
                }
                if self.do_irq {
                    let _ = self.bus_read(self.regs.pc);
                    self.do_irq = false;
                    self.int_vector = 0xfffe;
                    self.in_interrupt = true;
                    self.program = IRQ_PROGRAM;
                    self.step_idx = 0;
                    return Flow::Stay;
                }
                let pc = self.regs.pc;
                self.opcode = self.fetch_byte();
                self.in_interrupt = false;
                self.program = decode(self.opcode);
                self.step_idx = 0;
                self.fixup = false;
                self.crossed = false;
                if log_enabled!(Level::Trace) {
                    trace!(target: "cpu::ins", "0x{:04x}: {:02x}; {}", pc, self.opcode, &self);
                }
                Flow::Stay
            }
            MicroOp::IdleFetch => {
                let _ = self.bus_read(self.regs.pc);
                self.finish_or_advance(step.exec)
            }
            MicroOp::FetchOperand => {
                self.data = self.fetch_byte();
                if let Some(Exec::Brk) = step.exec {
                    self.int_vector = 0xfffe;
                    Flow::Advance
                } else {
                    self.finish_or_advance(step.exec)
                }
            }
            MicroOp::FetchAdl => {
                self.addr_lo = self.fetch_byte();
                self.addr_hi = 0;
                Flow::Advance
            }
            MicroOp::FetchAdh => {
                self.addr_hi = self.fetch_byte();
                Flow::Advance
            }
            MicroOp::FetchAdhAddX => {
                self.addr_hi = self.fetch_byte();
                let (lo, carry) = self.addr_lo.overflowing_add(self.regs.x);
                self.addr_lo = lo;
                self.fixup = carry;
                self.crossed = carry;
                Flow::Advance
            }
            MicroOp::FetchAdhAddY => {
                self.addr_hi = self.fetch_byte();
                let (lo, carry) = self.addr_lo.overflowing_add(self.regs.y);
                self.addr_lo = lo;
                self.fixup = carry;
                self.crossed = carry;
                Flow::Advance
            }
            MicroOp::FetchPtr => {
                self.ptr = self.fetch_byte();
                Flow::Advance
            }
            MicroOp::IdleReadPtrAddX => {
                let _ = self.bus_read(u16::from(self.ptr));
                self.ptr = self.ptr.wrapping_add(self.regs.x);
                Flow::Advance
            }
            MicroOp::FetchAdlFromPtr => {
                self.addr_lo = self.bus_read(u16::from(self.ptr));
                self.addr_hi = 0;
                Flow::Advance
            }
            MicroOp::FetchAdhFromPtr => {
                self.addr_hi = self.bus_read(u16::from(self.ptr.wrapping_add(1)));
                Flow::Advance
            }
            MicroOp::FetchAdhFromPtrAddY => {
                self.addr_hi = self.bus_read(u16::from(self.ptr.wrapping_add(1)));
                let (lo, carry) = self.addr_lo.overflowing_add(self.regs.y);
                self.addr_lo = lo;
                self.fixup = carry;
                self.crossed = carry;
                Flow::Advance
            }
            MicroOp::IdleReadAddX => {
                let _ = self.bus_read(self.addr());
                self.addr_lo = self.addr_lo.wrapping_add(self.regs.x);
                Flow::Advance
            }
            MicroOp::IdleReadAddY => {
                let _ = self.bus_read(self.addr());
                self.addr_lo = self.addr_lo.wrapping_add(self.regs.y);
                Flow::Advance
            }
            MicroOp::ReadData => {
                self.data = self.bus_read(self.addr());
                self.finish_or_advance(step.exec)
            }
            MicroOp::ReadDataOrFix => {
                if self.fixup {
                    let _ = self.bus_read(self.addr());
                    self.addr_hi = self.addr_hi.wrapping_add(1);
                    self.fixup = false;
                    Flow::Advance
                } else {
                    // no page crossing, this read is the final one
                    self.data = self.bus_read(self.addr());
                    self.finish(step.exec)
                }
            }
            MicroOp::IdleReadFix => {
                let _ = self.bus_read(self.addr());
                if let Some(exec) = step.exec {
                    self.execute_store_quirk(exec);
                } else if self.fixup {
                    self.addr_hi = self.addr_hi.wrapping_add(1);
                }
                self.fixup = false;
                Flow::Advance
            }
            MicroOp::WriteData => {
                if let Some(exec) = step.exec {
                    self.data = match exec {
                        Exec::Sta => self.regs.a,
                        Exec::Stx => self.regs.x,
                        Exec::Sty => self.regs.y,
                        Exec::Sax => self.regs.a & self.regs.x,
                        _ => self.data,
                    };
                }
                let addr = self.addr();
                let value = self.data;
                self.bus_write(addr, value);
                Flow::Done
            }
            MicroOp::RmwWriteOld => {
                let addr = self.addr();
                let value = self.data;
                self.bus_write(addr, value);
                if let Some(exec) = step.exec {
                    self.execute(exec);
                }
                Flow::Advance
            }
            MicroOp::RmwWriteNew => {
                let addr = self.addr();
                let value = self.data;
                self.bus_write(addr, value);
                Flow::Done
            }
            MicroOp::StackIdle => {
                let _ = self.bus_read(0x0100 + u16::from(self.regs.sp));
                Flow::Advance
            }
            MicroOp::Push => {
                let value = match step.exec {
                    Some(Exec::Php) => {
                        // pushed copy carries B and the unused bit
                        self.regs.p | (Flag::Break as u8) | (Flag::Reserved as u8)
                    }
                    _ => self.regs.a,
                };
                self.push(value);
                Flow::Done
            }
            MicroOp::Pull => {
                self.data = self.pop();
                self.finish(step.exec)
            }
            MicroOp::JmpFinish => {
                self.addr_hi = self.fetch_byte();
                self.regs.pc = self.addr();
                Flow::Done
            }
            MicroOp::FetchIndLo => {
                self.data = self.bus_read(self.addr());
                Flow::Advance
            }
            MicroOp::FetchIndHi => {
                // the pointer high byte wraps within the page
                let addr = (u16::from(self.addr_hi) << 8)
                    | u16::from(self.addr_lo.wrapping_add(1));
                let high = self.bus_read(addr);
                self.regs.pc = (u16::from(high) << 8) | u16::from(self.data);
                Flow::Done
            }
            MicroOp::PushPch => {
                let value = (self.regs.pc >> 8) as u8;
                self.push(value);
                Flow::Advance
            }
            MicroOp::PushPcl => {
                let value = (self.regs.pc & 0xff) as u8;
                self.push(value);
                Flow::Advance
            }
            MicroOp::PushPclInt => {
                let value = (self.regs.pc & 0xff) as u8;
                self.push(value);
                // a rising NMI edge at this point hijacks the sequence
                if self.nmi_edge_cur {
                    self.clear_nmi_edge();
                    self.do_nmi = false;
                    self.int_vector = 0xfffa;
                }
                Flow::Advance
            }
            MicroOp::PushPInt => {
                let value = (self.regs.p | Flag::Reserved as u8) & !(Flag::Break as u8);
                self.push(value);
                Flow::Advance
            }
            MicroOp::PushPBrk => {
                let value = self.regs.p | (Flag::Break as u8) | (Flag::Reserved as u8);
                self.push(value);
                Flow::Advance
            }
            MicroOp::PullP => {
                let value = self.pop();
                self.regs.p = (value | Flag::Reserved as u8) & !(Flag::Break as u8);
                Flow::Advance
            }
            MicroOp::PullPcl => {
                let value = self.pop();
                self.regs.pc = (self.regs.pc & 0xff00) | u16::from(value);
                Flow::Advance
            }
            MicroOp::PullPch => {
                let value = self.pop();
                self.regs.pc = (u16::from(value) << 8) | (self.regs.pc & 0x00ff);
                Flow::Advance
            }
            MicroOp::IncPc => {
                let _ = self.bus_read(self.regs.pc);
                self.regs.pc = self.regs.pc.wrapping_add(1);
                Flow::Done
            }
            MicroOp::FetchVectorLo => {
                let value = self.bus_read(self.int_vector);
                self.regs.pc = (self.regs.pc & 0xff00) | u16::from(value);
                self.set_flag(Flag::IntDisable, true);
                Flow::Advance
            }
            MicroOp::FetchVectorHi => {
                let value = self.bus_read(self.int_vector.wrapping_add(1));
                self.regs.pc = (u16::from(value) << 8) | (self.regs.pc & 0x00ff);
                Flow::DoneNoPoll
            }
            MicroOp::BranchDecide => {
                self.data = self.fetch_byte();
                self.poll_int();
                let taken = match step.exec {
                    Some(exec) => self.branch_condition(exec),
                    None => false,
                };
                if taken {
                    Flow::Advance
                } else {
                    Flow::DoneNoPoll
                }
            }
            MicroOp::BranchTake => {
                let _ = self.bus_read(self.regs.pc);
                let old_pc = self.regs.pc;
                let offset = i16::from(self.data as i8);
                self.regs.pc = self.regs.pc.wrapping_add(offset as u16);
                if (self.regs.pc & 0xff00) != (old_pc & 0xff00) {
                    self.branch_back = self.data & 0x80 != 0;
                    Flow::Advance
                } else {
                    // interrupts are not polled again on this path
                    Flow::DoneNoPoll
                }
            }
            MicroOp::BranchFixup => {
                let unfixed = if self.branch_back {
                    self.regs.pc.wrapping_add(0x100)
                } else {
                    self.regs.pc.wrapping_sub(0x100)
                };
                let _ = self.bus_read(unfixed);
                Flow::Done
            }
            MicroOp::Jam => {
                if !self.jammed {
                    self.jammed = true;
                    warn!(target: "cpu", "Illegal instruction 0x{:02x} at 0x{:04x}, CPU jammed",
                          self.opcode, self.regs.pc.wrapping_sub(1));
                }
                Flow::Stay
            }
        }
    }

    fn finish_or_advance(&mut self, exec: Option<Exec>) -> Flow {
        match exec {
            Some(_) => self.finish(exec),
            None => Flow::Advance,
        }
    }

    fn finish(&mut self, exec: Option<Exec>) -> Flow {
        match exec {
            Some(e) if e == Exec::Cli || e == Exec::Sei || e == Exec::Plp => {
                // these change the I mask after the poll, delaying the
                // effect by one instruction
                self.poll_int();
                self.execute(e);
                Flow::DoneNoPoll
            }
            Some(e) => {
                self.execute(e);
                Flow::Done
            }
            None => Flow::Done,
        }
    }

    fn branch_condition(&self, exec: Exec) -> bool {
        match exec {
            Exec::Bcc => !self.test_flag(Flag::Carry),
            Exec::Bcs => self.test_flag(Flag::Carry),
            Exec::Beq => self.test_flag(Flag::Zero),
            Exec::Bne => !self.test_flag(Flag::Zero),
            Exec::Bmi => self.test_flag(Flag::Negative),
            Exec::Bpl => !self.test_flag(Flag::Negative),
            Exec::Bvc => !self.test_flag(Flag::Overflow),
            Exec::Bvs => self.test_flag(Flag::Overflow),
            _ => panic!("invalid branch executor {:?}", exec),
        }
    }

    // -- Data path

    fn execute(&mut self, exec: Exec) {
        match exec {
            // Data movement
            Exec::Lda => {
                let value = self.data;
                self.update_nz(value);
                self.regs.a = value;
            }
            Exec::Ldx => {
                let value = self.data;
                self.update_nz(value);
                self.regs.x = value;
            }
            Exec::Ldy => {
                let value = self.data;
                self.update_nz(value);
                self.regs.y = value;
            }
            Exec::Tax => {
                let value = self.regs.a;
                self.update_nz(value);
                self.regs.x = value;
            }
            Exec::Tay => {
                let value = self.regs.a;
                self.update_nz(value);
                self.regs.y = value;
            }
            Exec::Tsx => {
                let value = self.regs.sp;
                self.update_nz(value);
                self.regs.x = value;
            }
            Exec::Txa => {
                let value = self.regs.x;
                self.update_nz(value);
                self.regs.a = value;
            }
            Exec::Txs => {
                // NOTE does not set nz
                self.regs.sp = self.regs.x;
            }
            Exec::Tya => {
                let value = self.regs.y;
                self.update_nz(value);
                self.regs.a = value;
            }
            Exec::Pla => {
                let value = self.data;
                self.update_nz(value);
                self.regs.a = value;
            }
            Exec::Plp => {
                self.regs.p =
                    (self.data | Flag::Reserved as u8) & !(Flag::Break as u8);
            }
            // Arithmetic
            Exec::Adc => {
                let value = self.data;
                self.adc(value);
            }
            Exec::Sbc => {
                let value = self.data;
                self.sbc(value);
            }
            Exec::Cmp => {
                let result = u16::from(self.regs.a).wrapping_sub(u16::from(self.data));
                self.set_flag(Flag::Carry, result < 0x100);
                self.update_nz((result & 0xff) as u8);
            }
            Exec::Cpx => {
                let result = u16::from(self.regs.x).wrapping_sub(u16::from(self.data));
                self.set_flag(Flag::Carry, result < 0x100);
                self.update_nz((result & 0xff) as u8);
            }
            Exec::Cpy => {
                let result = u16::from(self.regs.y).wrapping_sub(u16::from(self.data));
                self.set_flag(Flag::Carry, result < 0x100);
                self.update_nz((result & 0xff) as u8);
            }
            Exec::Inc => {
                self.data = self.data.wrapping_add(1);
                let value = self.data;
                self.update_nz(value);
            }
            Exec::Dec => {
                self.data = self.data.wrapping_sub(1);
                let value = self.data;
                self.update_nz(value);
            }
            Exec::Inx => {
                let value = self.regs.x.wrapping_add(1);
                self.update_nz(value);
                self.regs.x = value;
            }
            Exec::Iny => {
                let value = self.regs.y.wrapping_add(1);
                self.update_nz(value);
                self.regs.y = value;
            }
            Exec::Dex => {
                let value = self.regs.x.wrapping_sub(1);
                self.update_nz(value);
                self.regs.x = value;
            }
            Exec::Dey => {
                let value = self.regs.y.wrapping_sub(1);
                self.update_nz(value);
                self.regs.y = value;
            }
            // Logical
            Exec::And => {
                let value = self.regs.a & self.data;
                self.update_nz(value);
                self.regs.a = value;
            }
            Exec::Eor => {
                let value = self.regs.a ^ self.data;
                self.update_nz(value);
                self.regs.a = value;
            }
            Exec::Ora => {
                let value = self.regs.a | self.data;
                self.update_nz(value);
                self.regs.a = value;
            }
            Exec::Bit => {
                let value = self.data;
                self.set_flag(Flag::Negative, value & 0x80 != 0);
                self.set_flag(Flag::Overflow, value & 0x40 != 0);
                self.set_flag(Flag::Zero, value & self.regs.a == 0);
            }
            // Shift and rotate
            Exec::Asl => {
                self.data = self.asl(self.data);
            }
            Exec::AslA => {
                self.regs.a = self.asl(self.regs.a);
            }
            Exec::Lsr => {
                self.data = self.lsr(self.data);
            }
            Exec::LsrA => {
                self.regs.a = self.lsr(self.regs.a);
            }
            Exec::Rol => {
                self.data = self.rol(self.data);
            }
            Exec::RolA => {
                self.regs.a = self.rol(self.regs.a);
            }
            Exec::Ror => {
                self.data = self.ror(self.data);
            }
            Exec::RorA => {
                self.regs.a = self.ror(self.regs.a);
            }
            // Flags
            Exec::Clc => self.set_flag(Flag::Carry, false),
            Exec::Cld => self.set_flag(Flag::Decimal, false),
            Exec::Cli => self.set_flag(Flag::IntDisable, false),
            Exec::Clv => self.set_flag(Flag::Overflow, false),
            Exec::Sec => self.set_flag(Flag::Carry, true),
            Exec::Sed => self.set_flag(Flag::Decimal, true),
            Exec::Sei => self.set_flag(Flag::IntDisable, true),
            Exec::Nop => {}
            // Undocumented
            Exec::Slo => {
                self.data = self.asl(self.data);
                let value = self.regs.a | self.data;
                self.update_nz(value);
                self.regs.a = value;
            }
            Exec::Rla => {
                self.data = self.rol(self.data);
                let value = self.regs.a & self.data;
                self.update_nz(value);
                self.regs.a = value;
            }
            Exec::Sre => {
                self.data = self.lsr(self.data);
                let value = self.regs.a ^ self.data;
                self.update_nz(value);
                self.regs.a = value;
            }
            Exec::Rra => {
                self.data = self.ror(self.data);
                let value = self.data;
                self.adc(value);
            }
            Exec::Dcp => {
                self.data = self.data.wrapping_sub(1);
                let result = u16::from(self.regs.a).wrapping_sub(u16::from(self.data));
                self.set_flag(Flag::Carry, result < 0x100);
                self.update_nz((result & 0xff) as u8);
            }
            Exec::Isc => {
                self.data = self.data.wrapping_add(1);
                let value = self.data;
                self.sbc(value);
            }
            Exec::Lax => {
                let value = self.data;
                self.update_nz(value);
                self.regs.a = value;
                self.regs.x = value;
            }
            Exec::Las => {
                let value = self.data & self.regs.sp;
                self.update_nz(value);
                self.regs.a = value;
                self.regs.x = value;
                self.regs.sp = value;
            }
            Exec::Anc => {
                let value = self.regs.a & self.data;
                self.update_nz(value);
                self.regs.a = value;
                let negative = self.test_flag(Flag::Negative);
                self.set_flag(Flag::Carry, negative);
            }
            Exec::Alr => {
                let value = self.regs.a & self.data;
                self.set_flag(Flag::Carry, value & 0x01 != 0);
                let result = value >> 1;
                self.update_nz(result);
                self.regs.a = result;
            }
            Exec::Arr => {
                self.arr();
            }
            Exec::Ane => {
                let value = self.regs.x & self.data & (self.regs.a | 0xee);
                self.update_nz(value);
                self.regs.a = value;
            }
            Exec::Lxa => {
                let value = self.data & (self.regs.a | 0xee);
                self.update_nz(value);
                self.regs.a = value;
                self.regs.x = value;
            }
            Exec::Axs => {
                let lhs = self.regs.a & self.regs.x;
                let result = u16::from(lhs).wrapping_sub(u16::from(self.data));
                self.set_flag(Flag::Carry, lhs >= self.data);
                let value = (result & 0xff) as u8;
                self.update_nz(value);
                self.regs.x = value;
            }
            _ => panic!("invalid executor {:?}", exec),
        }
    }

    /// SHA/SHX/SHY/TAS compute their store value in the fix-up cycle. On a
    /// page crossing, the high byte of the target address is corrupted by
    /// the stored value.
    fn execute_store_quirk(&mut self, exec: Exec) {
        let mask = match exec {
            Exec::Sha => self.regs.a & self.regs.x,
            Exec::Shx => self.regs.x,
            Exec::Shy => self.regs.y,
            Exec::Tas => {
                self.regs.sp = self.regs.a & self.regs.x;
                self.regs.a & self.regs.x
            }
            _ => panic!("invalid store quirk executor {:?}", exec),
        };
        self.data = mask & self.addr_hi.wrapping_add(1);
        if self.fixup {
            self.addr_hi = self.addr_hi.wrapping_add(1);
            self.addr_hi &= mask;
        }
    }

    fn adc(&mut self, value: u8) {
        let ac = u16::from(self.regs.a);
        let value = u16::from(value);
        let carry = if self.test_flag(Flag::Carry) { 1 } else { 0 };
        let temp = if !self.test_flag(Flag::Decimal) {
            ac.wrapping_add(value).wrapping_add(carry)
        } else {
            let mut t = (ac & 0x0f) + (value & 0x0f) + carry;
            if t > 0x09 {
                t += 0x06;
            }
            t += (ac & 0xf0) + (value & 0xf0);
            if t & 0x01f0 > 0x90 {
                t += 0x60;
            }
            t
        };
        self.set_flag(
            Flag::Overflow,
            (ac ^ value) & 0x80 == 0 && (ac ^ temp) & 0x80 == 0x80,
        );
        self.set_flag(Flag::Carry, temp > 0xff);
        let result = (temp & 0xff) as u8;
        self.update_nz(result);
        self.regs.a = result;
    }

    fn sbc(&mut self, value: u8) {
        let ac = u16::from(self.regs.a);
        let value = u16::from(value);
        let carry = if self.test_flag(Flag::Carry) { 0 } else { 1 };
        let temp = if !self.test_flag(Flag::Decimal) {
            ac.wrapping_sub(value).wrapping_sub(carry)
        } else {
            let mut t = (ac & 0x0f).wrapping_sub(value & 0x0f).wrapping_sub(carry);
            if t & 0x10 != 0 {
                t = (t.wrapping_sub(0x06) & 0x0f)
                    | (ac & 0xf0).wrapping_sub(value & 0xf0).wrapping_sub(0x10);
            } else {
                t = (t & 0x0f) | (ac & 0xf0).wrapping_sub(value & 0xf0);
            }
            if t & 0x0100 != 0 {
                t = t.wrapping_sub(0x60);
            }
            t
        };
        self.set_flag(
            Flag::Overflow,
            (ac ^ temp) & 0x80 != 0 && (ac ^ value) & 0x80 == 0x80,
        );
        self.set_flag(Flag::Carry, temp < 0x100);
        let result = (temp & 0xff) as u8;
        self.update_nz(result);
        self.regs.a = result;
    }

    fn arr(&mut self) {
        let and = self.regs.a & self.data;
        let mut result = if self.test_flag(Flag::Carry) {
            (and >> 1) | 0x80
        } else {
            and >> 1
        };
        if !self.test_flag(Flag::Decimal) {
            self.update_nz(result);
            self.set_flag(Flag::Carry, result & 0x40 != 0);
            self.set_flag(
                Flag::Overflow,
                ((result & 0x40) ^ ((result & 0x20) << 1)) != 0,
            );
        } else {
            let carry_in = self.test_flag(Flag::Carry);
            self.set_flag(Flag::Negative, carry_in);
            self.set_flag(Flag::Zero, result == 0);
            self.set_flag(Flag::Overflow, (and ^ result) & 0x40 != 0);
            if (and & 0x0f) + (and & 0x01) > 5 {
                result = (result & 0xf0) | (result.wrapping_add(6) & 0x0f);
            }
            if (u16::from(and) + u16::from(and & 0x10)) & 0x1f0 > 0x50 {
                self.set_flag(Flag::Carry, true);
                result = result.wrapping_add(0x60);
            } else {
                self.set_flag(Flag::Carry, false);
            }
        }
        self.regs.a = result;
    }

    fn asl(&mut self, value: u8) -> u8 {
        self.set_flag(Flag::Carry, value & 0x80 != 0);
        let result = value << 1;
        self.update_nz(result);
        result
    }

    fn lsr(&mut self, value: u8) -> u8 {
        self.set_flag(Flag::Carry, value & 0x01 != 0);
        let result = value >> 1;
        self.update_nz(result);
        result
    }

    fn rol(&mut self, value: u8) -> u8 {
        let mut temp = u16::from(value) << 1;
        if self.test_flag(Flag::Carry) {
            temp |= 0x01;
        }
        self.set_flag(Flag::Carry, temp > 0xff);
        let result = (temp & 0xff) as u8;
        self.update_nz(result);
        result
    }

    fn ror(&mut self, value: u8) -> u8 {
        let mut temp = u16::from(value);
        if self.test_flag(Flag::Carry) {
            temp |= 0x100;
        }
        self.set_flag(Flag::Carry, temp & 0x01 != 0);
        let result = ((temp >> 1) & 0xff) as u8;
        self.update_nz(result);
        result
    }
}

impl Cpu for Cpu6510 {
    fn get_register(&self, reg: Register) -> u8 {
        match reg {
            Register::A => self.regs.a,
            Register::X => self.regs.x,
            Register::Y => self.regs.y,
            Register::SP => self.regs.sp,
            Register::P => self.regs.p | Flag::Reserved as u8,
        }
    }

    fn set_register(&mut self, reg: Register, value: u8) {
        match reg {
            Register::A => self.regs.a = value,
            Register::X => self.regs.x = value,
            Register::Y => self.regs.y = value,
            Register::SP => self.regs.sp = value,
            Register::P => {
                self.regs.p = (value | Flag::Reserved as u8) & !(Flag::Break as u8)
            }
        }
    }

    fn get_pc(&self) -> u16 {
        self.regs.pc
    }

    fn set_pc(&mut self, value: u16) {
        self.regs.pc = value;
        self.program = FETCH_PROGRAM;
        self.step_idx = 0;
    }

    fn is_jammed(&self) -> bool {
        self.jammed
    }

    fn at_fetch(&self) -> bool {
        !self.jammed && self.program[self.step_idx].uop == MicroOp::FetchOpcode
    }

    fn step_cycle(&mut self) {
        if self.jammed {
            return;
        }
        let step = self.program[self.step_idx];
        // BA low freezes the CPU on read cycles; write cycles proceed
        if self.ba_line.borrow().is_low() && !step.uop.is_write() {
            self.update_detectors();
            return;
        }
        self.update_detectors();
        match self.run_step(step) {
            Flow::Advance => {
                self.step_idx += 1;
                if self.step_idx == self.program.len() {
                    let last = self.program[self.step_idx - 1].uop;
                    if last != MicroOp::FetchVectorHi {
                        self.poll_int();
                    }
                    self.program = FETCH_PROGRAM;
                    self.step_idx = 0;
                }
            }
            Flow::Done => {
                self.poll_int();
                self.program = FETCH_PROGRAM;
                self.step_idx = 0;
            }
            Flow::DoneNoPoll => {
                self.program = FETCH_PROGRAM;
                self.step_idx = 0;
            }
            Flow::Stay => {}
        }
    }

    fn set_overflow_pin(&mut self) {
        self.set_flag(Flag::Overflow, true);
    }

    fn reset(&mut self) {
        self.regs.reset();
        self.program = FETCH_PROGRAM;
        self.step_idx = 0;
        self.jammed = false;
        self.do_irq = false;
        self.do_nmi = false;
        self.irq_level_cur = false;
        self.irq_level_del = false;
        self.nmi_edge_cur = false;
        self.nmi_edge_del = false;
        self.nmi_last = false;
        self.fixup = false;
        self.crossed = false;
        self.irq_line.borrow_mut().reset();
        self.nmi_line.borrow_mut().reset();
        if self.io_port.is_some() {
            if let Some(ref port) = self.io_port {
                port.borrow_mut().set_value(0xff);
            }
            self.write(0x0000, 0b0010_1111);
            self.write(0x0001, 0b0001_1111);
        }
        let low = self.bus_read(0xfffc);
        let high = self.bus_read(0xfffd);
        self.regs.pc = (u16::from(high) << 8) | u16::from(low);
    }

    // -- I/O

    fn read(&self, address: u16) -> u8 {
        self.bus_read(address)
    }

    fn write(&mut self, address: u16, value: u8) {
        self.bus_write(address, value);
    }

    // -- State

    fn save_state(&self, writer: &mut StateWriter) {
        writer.write_u8(self.regs.a);
        writer.write_u8(self.regs.x);
        writer.write_u8(self.regs.y);
        writer.write_u8(self.regs.sp);
        writer.write_u16(self.regs.pc);
        writer.write_u8(self.regs.p);
        writer.write_u8(self.opcode);
        writer.write_bool(self.in_interrupt);
        writer.write_u8(self.step_idx as u8);
        writer.write_bool(self.at_fetch());
        writer.write_u8(self.addr_lo);
        writer.write_u8(self.addr_hi);
        writer.write_u8(self.ptr);
        writer.write_u8(self.data);
        writer.write_bool(self.fixup);
        writer.write_bool(self.crossed);
        writer.write_bool(self.branch_back);
        writer.write_u16(self.int_vector);
        writer.write_bool(self.irq_level_cur);
        writer.write_bool(self.irq_level_del);
        writer.write_bool(self.nmi_edge_cur);
        writer.write_bool(self.nmi_edge_del);
        writer.write_bool(self.nmi_last);
        writer.write_bool(self.do_irq);
        writer.write_bool(self.do_nmi);
        writer.write_bool(self.jammed);
    }

    fn restore_state(&mut self, reader: &mut StateReader) -> Result<(), Error> {
        self.regs.a = reader.read_u8()?;
        self.regs.x = reader.read_u8()?;
        self.regs.y = reader.read_u8()?;
        self.regs.sp = reader.read_u8()?;
        self.regs.pc = reader.read_u16()?;
        self.regs.p = reader.read_u8()?;
        self.opcode = reader.read_u8()?;
        self.in_interrupt = reader.read_bool()?;
        let step_idx = reader.read_u8()? as usize;
        let at_fetch = reader.read_bool()?;
        self.program = if at_fetch {
            FETCH_PROGRAM
        } else if self.in_interrupt {
            IRQ_PROGRAM
        } else {
            decode(self.opcode)
        };
        self.step_idx = if step_idx < self.program.len() {
            step_idx
        } else {
            0
        };
        self.addr_lo = reader.read_u8()?;
        self.addr_hi = reader.read_u8()?;
        self.ptr = reader.read_u8()?;
        self.data = reader.read_u8()?;
        self.fixup = reader.read_bool()?;
        self.crossed = reader.read_bool()?;
        self.branch_back = reader.read_bool()?;
        self.int_vector = reader.read_u16()?;
        self.irq_level_cur = reader.read_bool()?;
        self.irq_level_del = reader.read_bool()?;
        self.nmi_edge_cur = reader.read_bool()?;
        self.nmi_edge_del = reader.read_bool()?;
        self.nmi_last = reader.read_bool()?;
        self.do_irq = reader.read_bool()?;
        self.do_nmi = reader.read_bool()?;
        self.jammed = reader.read_bool()?;
        Ok(())
    }
}

impl fmt::Display for Cpu6510 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:02x} {:02x} {:02x} {:02x} {}{}{}{}{}{}",
            self.regs.a,
            self.regs.x,
            self.regs.y,
            self.regs.sp,
            if self.test_flag(Flag::Negative) { "N" } else { "n" },
            if self.test_flag(Flag::Overflow) { "V" } else { "v" },
            if self.test_flag(Flag::Decimal) { "D" } else { "d" },
            if self.test_flag(Flag::IntDisable) { "I" } else { "i" },
            if self.test_flag(Flag::Zero) { "Z" } else { "z" },
            if self.test_flag(Flag::Carry) { "C" } else { "c" },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::{new_shared, Ram};

    struct MockMemory {
        ram: Ram,
    }

    impl MockMemory {
        pub fn new(ram: Ram) -> Self {
            Self { ram }
        }
    }

    impl Addressable for MockMemory {
        fn read(&self, address: u16) -> u8 {
            self.ram.read(address)
        }

        fn write(&mut self, address: u16, value: u8) {
            self.ram.write(address, value);
        }
    }

    fn setup_cpu() -> (Cpu6510, Shared<MockMemory>) {
        let ba_line = new_shared(Pin::new_high());
        let cpu_io_port = new_shared(IoPort::new(0x00, 0xff));
        let cpu_irq = new_shared(IrqLine::new("irq"));
        let cpu_nmi = new_shared(IrqLine::new("nmi"));
        let mem = new_shared(MockMemory::new(Ram::new(0x10000)));
        let cpu = Cpu6510::new(
            mem.clone(),
            Some(cpu_io_port),
            ba_line,
            cpu_irq,
            cpu_nmi,
        );
        (cpu, mem)
    }

    fn run_instruction(cpu: &mut Cpu6510) -> u32 {
        assert!(cpu.at_fetch());
        cpu.step_cycle();
        let mut cycles = 1;
        while !cpu.at_fetch() && !cpu.is_jammed() {
            cpu.step_cycle();
            cycles += 1;
        }
        cycles
    }

    #[test]
    fn adc_80_16() {
        let (mut cpu, mem) = setup_cpu();
        mem.borrow_mut().write(0x1000, 0x69);
        mem.borrow_mut().write(0x1001, 16);
        cpu.set_pc(0x1000);
        cpu.set_register(Register::A, 80);
        run_instruction(&mut cpu);
        assert_eq!(96, cpu.get_register(Register::A));
        assert_eq!(false, cpu.test_flag(Flag::Carry));
        assert_eq!(false, cpu.test_flag(Flag::Negative));
        assert_eq!(false, cpu.test_flag(Flag::Overflow));
    }

    #[test]
    fn adc_bcd() {
        let (mut cpu, mem) = setup_cpu();
        mem.borrow_mut().write(0x1000, 0x69);
        mem.borrow_mut().write(0x1001, 0x01);
        cpu.set_pc(0x1000);
        cpu.set_register(Register::A, 0x09);
        cpu.set_flag(Flag::Decimal, true);
        cpu.set_flag(Flag::Carry, false);
        run_instruction(&mut cpu);
        assert_eq!(0x10, cpu.get_register(Register::A));
        assert_eq!(false, cpu.test_flag(Flag::Carry));
        assert_eq!(false, cpu.test_flag(Flag::Zero));
        assert_eq!(false, cpu.test_flag(Flag::Negative));
    }

    #[test]
    fn lda_absolute_x_page_cross_timing() {
        let (mut cpu, mem) = setup_cpu();
        mem.borrow_mut().write(0x1000, 0xbd); // LDA $1001,X
        mem.borrow_mut().write(0x1001, 0x01);
        mem.borrow_mut().write(0x1002, 0x10);
        mem.borrow_mut().write(0x1100, 0x55);
        cpu.set_pc(0x1000);
        cpu.set_register(Register::X, 0xff);
        let cycles = run_instruction(&mut cpu);
        assert_eq!(5, cycles);
        assert_eq!(0x55, cpu.get_register(Register::A));
    }

    #[test]
    fn lda_absolute_x_no_cross_timing() {
        let (mut cpu, mem) = setup_cpu();
        mem.borrow_mut().write(0x1000, 0xbd); // LDA $1001,X
        mem.borrow_mut().write(0x1001, 0x01);
        mem.borrow_mut().write(0x1002, 0x10);
        mem.borrow_mut().write(0x1011, 0xaa);
        cpu.set_pc(0x1000);
        cpu.set_register(Register::X, 0x10);
        let cycles = run_instruction(&mut cpu);
        assert_eq!(4, cycles);
        assert_eq!(0xaa, cpu.get_register(Register::A));
    }

    #[test]
    fn jmp_indirect_page_wrap() {
        let (mut cpu, mem) = setup_cpu();
        mem.borrow_mut().write(0x1000, 0x6c); // JMP ($02FF)
        mem.borrow_mut().write(0x1001, 0xff);
        mem.borrow_mut().write(0x1002, 0x02);
        mem.borrow_mut().write(0x02ff, 0x34);
        mem.borrow_mut().write(0x0200, 0x12);
        mem.borrow_mut().write(0x0300, 0xab);
        cpu.set_pc(0x1000);
        run_instruction(&mut cpu);
        assert_eq!(0x1234, cpu.get_pc());
    }

    #[test]
    fn rmw_double_write() {
        let (mut cpu, mem) = setup_cpu();
        mem.borrow_mut().write(0x1000, 0xe6); // INC $20
        mem.borrow_mut().write(0x1001, 0x20);
        mem.borrow_mut().write(0x0020, 0x41);
        cpu.set_pc(0x1000);
        // after the 4th cycle, the unmodified value has been written back
        assert!(cpu.at_fetch());
        cpu.step_cycle(); // fetch
        cpu.step_cycle(); // adl
        cpu.step_cycle(); // read
        cpu.step_cycle(); // write old
        assert_eq!(0x41, mem.borrow().ram.read(0x0020));
        cpu.step_cycle(); // write new
        assert_eq!(0x42, mem.borrow().ram.read(0x0020));
        assert!(cpu.at_fetch());
    }

    #[test]
    fn jam_halts() {
        let (mut cpu, mem) = setup_cpu();
        mem.borrow_mut().write(0x1000, 0x02);
        cpu.set_pc(0x1000);
        cpu.step_cycle();
        cpu.step_cycle();
        assert!(cpu.is_jammed());
        let pc = cpu.get_pc();
        cpu.step_cycle();
        assert_eq!(pc, cpu.get_pc());
    }

    #[test]
    fn irq_sequence() {
        let (mut cpu, mem) = setup_cpu();
        mem.borrow_mut().write(0x1000, 0xea); // NOP
        mem.borrow_mut().write(0x1001, 0xea);
        mem.borrow_mut().write(0xfffe, 0x00);
        mem.borrow_mut().write(0xffff, 0x80);
        cpu.set_pc(0x1000);
        cpu.set_flag(Flag::IntDisable, false);
        cpu.irq_line.borrow_mut().set_low(0, true);
        // run until the interrupt sequence lands on the vector
        for _ in 0..20 {
            cpu.step_cycle();
            if cpu.get_pc() == 0x8000 {
                break;
            }
        }
        assert_eq!(0x8000, cpu.get_pc());
        assert!(cpu.test_flag(Flag::IntDisable));
    }

    #[test]
    fn nmi_hijacks_brk() {
        let (mut cpu, mem) = setup_cpu();
        mem.borrow_mut().write(0x1000, 0x00); // BRK
        mem.borrow_mut().write(0xfffe, 0x00);
        mem.borrow_mut().write(0xffff, 0x80);
        mem.borrow_mut().write(0xfffa, 0x00);
        mem.borrow_mut().write(0xfffb, 0x90);
        cpu.set_pc(0x1000);
        assert!(cpu.at_fetch());
        cpu.step_cycle(); // fetch BRK
        cpu.step_cycle(); // signature byte
        // NMI edge arrives while the push sequence is in flight
        cpu.nmi_line.borrow_mut().set_low(0, true);
        cpu.step_cycle(); // push pch
        cpu.step_cycle(); // push pcl + hijack check
        cpu.step_cycle(); // push p
        cpu.step_cycle(); // vector low
        cpu.step_cycle(); // vector high
        assert_eq!(0x9000, cpu.get_pc());
    }

    #[test]
    fn ba_low_stalls_reads_not_writes() {
        let (mut cpu, mem) = setup_cpu();
        mem.borrow_mut().write(0x1000, 0x8d); // STA $2000
        mem.borrow_mut().write(0x1001, 0x00);
        mem.borrow_mut().write(0x1002, 0x20);
        cpu.set_pc(0x1000);
        cpu.set_register(Register::A, 0x77);
        cpu.step_cycle(); // fetch
        cpu.step_cycle(); // adl
        cpu.step_cycle(); // adh
        cpu.ba_line.borrow_mut().set_active(false);
        cpu.step_cycle(); // write proceeds despite stolen bus
        assert_eq!(0x77, mem.borrow().ram.read(0x2000));
        assert!(cpu.at_fetch());
        // but the next fetch is frozen
        cpu.step_cycle();
        assert!(cpu.at_fetch());
        cpu.ba_line.borrow_mut().set_active(true);
        cpu.step_cycle();
        assert!(!cpu.at_fetch());
    }

    #[test]
    fn save_restore_state() {
        let (mut cpu, mem) = setup_cpu();
        mem.borrow_mut().write(0x1000, 0xa9);
        mem.borrow_mut().write(0x1001, 0x42);
        cpu.set_pc(0x1000);
        run_instruction(&mut cpu);
        let mut writer = StateWriter::new();
        cpu.save_state(&mut writer);
        let data = writer.into_data();
        let (mut other, _) = setup_cpu();
        let mut reader = StateReader::new(&data);
        other.restore_state(&mut reader).unwrap();
        assert_eq!(0x42, other.get_register(Register::A));
        assert_eq!(cpu.get_pc(), other.get_pc());
        assert!(other.at_fetch());
    }
}
