// This file is part of cobalt64.
// Copyright (c) 2019-2022 The cobalt64 authors. All rights reserved.
// Licensed under the GPLv3. See LICENSE file in the project root for full license text.

// Every opcode decomposes into a fixed micro-instruction program executed one
// step per clock cycle. The opcode fetch itself is the shared FETCH program,
// so a program holds the remaining cycles only: a 2-cycle implied opcode has
// a single step. Addressing-mode constructors below assemble the programs;
// the per-cycle work for each MicroOp lives in cpu6510.

/// One clock cycle worth of bus/internal work.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum MicroOp {
    /// Fetch the next opcode, or divert to the interrupt programs.
    FetchOpcode,
    /// Dummy read at PC without consuming the byte.
    IdleFetch,
    /// Read operand byte at PC.
    FetchOperand,
    /// Read effective address low byte at PC.
    FetchAdl,
    /// Read effective address high byte at PC.
    FetchAdh,
    /// Read address high byte, add X to the low byte (carry pends a fixup).
    FetchAdhAddX,
    /// Read address high byte, add Y to the low byte (carry pends a fixup).
    FetchAdhAddY,
    /// Read zero-page pointer at PC.
    FetchPtr,
    /// Dummy read through the pointer, then add X to it (page wraps).
    IdleReadPtrAddX,
    /// Read effective address low byte through the zero-page pointer.
    FetchAdlFromPtr,
    /// Read effective address high byte through the zero-page pointer.
    FetchAdhFromPtr,
    /// Read address high byte through the pointer, add Y to the low byte.
    FetchAdhFromPtrAddY,
    /// Dummy read at the unindexed zero-page address, then add X.
    IdleReadAddX,
    /// Dummy read at the unindexed zero-page address, then add Y.
    IdleReadAddY,
    /// Read the operand from the effective address.
    ReadData,
    /// Page-cross decision cycle of indexed reads: without a carry this is
    /// the final data read, with a carry it is a dummy read that fixes the
    /// address high byte.
    ReadDataOrFix,
    /// Always-taken dummy read of indexed writes and read-modify-writes,
    /// fixing the address high byte if needed.
    IdleReadFix,
    /// Write the operand to the effective address.
    WriteData,
    /// First half of the read-modify-write double write: put the unmodified
    /// value back on the bus while the ALU runs.
    RmwWriteOld,
    /// Second half of the double write: store the modified value.
    RmwWriteNew,
    /// Dummy read at the current stack location.
    StackIdle,
    /// Push a value produced by the executor.
    Push,
    /// Pop a value and hand it to the executor.
    Pull,
    /// Read the jump target high byte at PC and load PC (JMP/JSR final).
    JmpFinish,
    /// Read the new PCL through the indirect pointer.
    FetchIndLo,
    /// Read the new PCH; the pointer low byte wraps within the page.
    FetchIndHi,
    /// Push PC high byte.
    PushPch,
    /// Push PC low byte.
    PushPcl,
    /// Push PC low byte, then look for a rising NMI edge that hijacks the
    /// sequence over to the NMI vector.
    PushPclInt,
    /// Push the flags with the B bit cleared (IRQ/NMI).
    PushPInt,
    /// Push the flags with the B bit set (BRK).
    PushPBrk,
    /// Pop the flags (B and the unused bit are virtual).
    PullP,
    /// Pop PC low byte.
    PullPcl,
    /// Pop PC high byte.
    PullPch,
    /// Dummy read at PC, then increment it (RTS tail).
    IncPc,
    /// Read the interrupt vector low byte and set the I flag.
    FetchVectorLo,
    /// Read the interrupt vector high byte.
    FetchVectorHi,
    /// Fetch the branch offset, poll interrupts and test the condition.
    BranchDecide,
    /// Apply the branch offset; an extra cycle follows on page crossing.
    BranchTake,
    /// Dummy read at the unfixed branch target, then poll again.
    BranchFixup,
    /// Halt. The program counter freezes at the jam opcode.
    Jam,
}

impl MicroOp {
    /// Write cycles proceed even while the VIC holds BA low; everything
    /// else stalls.
    pub fn is_write(self) -> bool {
        match self {
            MicroOp::WriteData
            | MicroOp::RmwWriteOld
            | MicroOp::RmwWriteNew
            | MicroOp::Push
            | MicroOp::PushPch
            | MicroOp::PushPcl
            | MicroOp::PushPclInt
            | MicroOp::PushPInt
            | MicroOp::PushPBrk => true,
            _ => false,
        }
    }
}

/// Data-path executor attached to the step that completes an instruction.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Exec {
    // Data movement
    Lda,
    Ldx,
    Ldy,
    Sta,
    Stx,
    Sty,
    Tax,
    Tay,
    Tsx,
    Txa,
    Txs,
    Tya,
    Pha,
    Php,
    Pla,
    Plp,
    // Arithmetic
    Adc,
    Sbc,
    Cmp,
    Cpx,
    Cpy,
    Inc,
    Dec,
    Inx,
    Iny,
    Dex,
    Dey,
    // Logical
    And,
    Eor,
    Ora,
    Bit,
    // Shift and rotate
    Asl,
    AslA,
    Lsr,
    LsrA,
    Rol,
    RolA,
    Ror,
    RorA,
    // Flags
    Clc,
    Cld,
    Cli,
    Clv,
    Sec,
    Sed,
    Sei,
    Nop,
    // Branches
    Bcc,
    Bcs,
    Beq,
    Bmi,
    Bne,
    Bpl,
    Bvc,
    Bvs,
    // Interrupt entry
    Brk,
    // Undocumented
    Slo,
    Rla,
    Sre,
    Rra,
    Sax,
    Lax,
    Dcp,
    Isc,
    Anc,
    Alr,
    Arr,
    Ane,
    Lxa,
    Axs,
    Las,
    Tas,
    Sha,
    Shx,
    Shy,
}

#[derive(Copy, Clone)]
pub struct Step {
    pub uop: MicroOp,
    pub exec: Option<Exec>,
}

impl Step {
    pub const fn from(uop: MicroOp) -> Step {
        Step { uop, exec: None }
    }

    pub const fn with(uop: MicroOp, exec: Exec) -> Step {
        Step {
            uop,
            exec: Some(exec),
        }
    }
}

const fn implied(exec: Exec) -> [Step; 1] {
    [Step::with(MicroOp::IdleFetch, exec)]
}

const fn immediate(exec: Exec) -> [Step; 1] {
    [Step::with(MicroOp::FetchOperand, exec)]
}

const fn zeropage_read(exec: Exec) -> [Step; 2] {
    [
        Step::from(MicroOp::FetchAdl),
        Step::with(MicroOp::ReadData, exec),
    ]
}

const fn zeropage_write(exec: Exec) -> [Step; 2] {
    [
        Step::from(MicroOp::FetchAdl),
        Step::with(MicroOp::WriteData, exec),
    ]
}

const fn zeropage_rmw(exec: Exec) -> [Step; 4] {
    [
        Step::from(MicroOp::FetchAdl),
        Step::from(MicroOp::ReadData),
        Step::with(MicroOp::RmwWriteOld, exec),
        Step::from(MicroOp::RmwWriteNew),
    ]
}

const fn zeropagex_read(exec: Exec) -> [Step; 3] {
    [
        Step::from(MicroOp::FetchAdl),
        Step::from(MicroOp::IdleReadAddX),
        Step::with(MicroOp::ReadData, exec),
    ]
}

const fn zeropagex_write(exec: Exec) -> [Step; 3] {
    [
        Step::from(MicroOp::FetchAdl),
        Step::from(MicroOp::IdleReadAddX),
        Step::with(MicroOp::WriteData, exec),
    ]
}

const fn zeropagex_rmw(exec: Exec) -> [Step; 5] {
    [
        Step::from(MicroOp::FetchAdl),
        Step::from(MicroOp::IdleReadAddX),
        Step::from(MicroOp::ReadData),
        Step::with(MicroOp::RmwWriteOld, exec),
        Step::from(MicroOp::RmwWriteNew),
    ]
}

const fn zeropagey_read(exec: Exec) -> [Step; 3] {
    [
        Step::from(MicroOp::FetchAdl),
        Step::from(MicroOp::IdleReadAddY),
        Step::with(MicroOp::ReadData, exec),
    ]
}

const fn zeropagey_write(exec: Exec) -> [Step; 3] {
    [
        Step::from(MicroOp::FetchAdl),
        Step::from(MicroOp::IdleReadAddY),
        Step::with(MicroOp::WriteData, exec),
    ]
}

const fn absolute_read(exec: Exec) -> [Step; 3] {
    [
        Step::from(MicroOp::FetchAdl),
        Step::from(MicroOp::FetchAdh),
        Step::with(MicroOp::ReadData, exec),
    ]
}

const fn absolute_write(exec: Exec) -> [Step; 3] {
    [
        Step::from(MicroOp::FetchAdl),
        Step::from(MicroOp::FetchAdh),
        Step::with(MicroOp::WriteData, exec),
    ]
}

const fn absolute_rmw(exec: Exec) -> [Step; 5] {
    [
        Step::from(MicroOp::FetchAdl),
        Step::from(MicroOp::FetchAdh),
        Step::from(MicroOp::ReadData),
        Step::with(MicroOp::RmwWriteOld, exec),
        Step::from(MicroOp::RmwWriteNew),
    ]
}

const fn absolutex_read(exec: Exec) -> [Step; 4] {
    [
        Step::from(MicroOp::FetchAdl),
        Step::from(MicroOp::FetchAdhAddX),
        Step::with(MicroOp::ReadDataOrFix, exec),
        Step::with(MicroOp::ReadData, exec),
    ]
}

const fn absolutex_write(exec: Exec) -> [Step; 4] {
    [
        Step::from(MicroOp::FetchAdl),
        Step::from(MicroOp::FetchAdhAddX),
        Step::from(MicroOp::IdleReadFix),
        Step::with(MicroOp::WriteData, exec),
    ]
}

const fn absolutex_rmw(exec: Exec) -> [Step; 6] {
    [
        Step::from(MicroOp::FetchAdl),
        Step::from(MicroOp::FetchAdhAddX),
        Step::from(MicroOp::IdleReadFix),
        Step::from(MicroOp::ReadData),
        Step::with(MicroOp::RmwWriteOld, exec),
        Step::from(MicroOp::RmwWriteNew),
    ]
}

const fn absolutey_read(exec: Exec) -> [Step; 4] {
    [
        Step::from(MicroOp::FetchAdl),
        Step::from(MicroOp::FetchAdhAddY),
        Step::with(MicroOp::ReadDataOrFix, exec),
        Step::with(MicroOp::ReadData, exec),
    ]
}

const fn absolutey_write(exec: Exec) -> [Step; 4] {
    [
        Step::from(MicroOp::FetchAdl),
        Step::from(MicroOp::FetchAdhAddY),
        Step::from(MicroOp::IdleReadFix),
        Step::with(MicroOp::WriteData, exec),
    ]
}

const fn absolutey_rmw(exec: Exec) -> [Step; 6] {
    [
        Step::from(MicroOp::FetchAdl),
        Step::from(MicroOp::FetchAdhAddY),
        Step::from(MicroOp::IdleReadFix),
        Step::from(MicroOp::ReadData),
        Step::with(MicroOp::RmwWriteOld, exec),
        Step::from(MicroOp::RmwWriteNew),
    ]
}

const fn indirectx_read(exec: Exec) -> [Step; 5] {
    [
        Step::from(MicroOp::FetchPtr),
        Step::from(MicroOp::IdleReadPtrAddX),
        Step::from(MicroOp::FetchAdlFromPtr),
        Step::from(MicroOp::FetchAdhFromPtr),
        Step::with(MicroOp::ReadData, exec),
    ]
}

const fn indirectx_write(exec: Exec) -> [Step; 5] {
    [
        Step::from(MicroOp::FetchPtr),
        Step::from(MicroOp::IdleReadPtrAddX),
        Step::from(MicroOp::FetchAdlFromPtr),
        Step::from(MicroOp::FetchAdhFromPtr),
        Step::with(MicroOp::WriteData, exec),
    ]
}

const fn indirectx_rmw(exec: Exec) -> [Step; 7] {
    [
        Step::from(MicroOp::FetchPtr),
        Step::from(MicroOp::IdleReadPtrAddX),
        Step::from(MicroOp::FetchAdlFromPtr),
        Step::from(MicroOp::FetchAdhFromPtr),
        Step::from(MicroOp::ReadData),
        Step::with(MicroOp::RmwWriteOld, exec),
        Step::from(MicroOp::RmwWriteNew),
    ]
}

const fn indirecty_read(exec: Exec) -> [Step; 5] {
    [
        Step::from(MicroOp::FetchPtr),
        Step::from(MicroOp::FetchAdlFromPtr),
        Step::from(MicroOp::FetchAdhFromPtrAddY),
        Step::with(MicroOp::ReadDataOrFix, exec),
        Step::with(MicroOp::ReadData, exec),
    ]
}

const fn indirecty_write(exec: Exec) -> [Step; 5] {
    [
        Step::from(MicroOp::FetchPtr),
        Step::from(MicroOp::FetchAdlFromPtr),
        Step::from(MicroOp::FetchAdhFromPtrAddY),
        Step::from(MicroOp::IdleReadFix),
        Step::with(MicroOp::WriteData, exec),
    ]
}

const fn indirecty_rmw(exec: Exec) -> [Step; 7] {
    [
        Step::from(MicroOp::FetchPtr),
        Step::from(MicroOp::FetchAdlFromPtr),
        Step::from(MicroOp::FetchAdhFromPtrAddY),
        Step::from(MicroOp::IdleReadFix),
        Step::from(MicroOp::ReadData),
        Step::with(MicroOp::RmwWriteOld, exec),
        Step::from(MicroOp::RmwWriteNew),
    ]
}

// SHA/SHX/SHY/TAS run their executor in the fix-up cycle where the stored
// value and the address corruption are computed.

const fn store_quirk_absy(exec: Exec) -> [Step; 4] {
    [
        Step::from(MicroOp::FetchAdl),
        Step::from(MicroOp::FetchAdhAddY),
        Step::with(MicroOp::IdleReadFix, exec),
        Step::from(MicroOp::WriteData),
    ]
}

const fn store_quirk_absx(exec: Exec) -> [Step; 4] {
    [
        Step::from(MicroOp::FetchAdl),
        Step::from(MicroOp::FetchAdhAddX),
        Step::with(MicroOp::IdleReadFix, exec),
        Step::from(MicroOp::WriteData),
    ]
}

const fn store_quirk_indy(exec: Exec) -> [Step; 5] {
    [
        Step::from(MicroOp::FetchPtr),
        Step::from(MicroOp::FetchAdlFromPtr),
        Step::from(MicroOp::FetchAdhFromPtrAddY),
        Step::with(MicroOp::IdleReadFix, exec),
        Step::from(MicroOp::WriteData),
    ]
}

const fn relative(exec: Exec) -> [Step; 3] {
    [
        Step::with(MicroOp::BranchDecide, exec),
        Step::from(MicroOp::BranchTake),
        Step::from(MicroOp::BranchFixup),
    ]
}

static LDA_IMMEDIATE: &[Step] = &immediate(Exec::Lda);
static LDA_ZEROPAGE: &[Step] = &zeropage_read(Exec::Lda);
static LDA_ZEROPAGEX: &[Step] = &zeropagex_read(Exec::Lda);
static LDA_ABSOLUTE: &[Step] = &absolute_read(Exec::Lda);
static LDA_ABSOLUTEX: &[Step] = &absolutex_read(Exec::Lda);
static LDA_ABSOLUTEY: &[Step] = &absolutey_read(Exec::Lda);
static LDA_INDIRECTX: &[Step] = &indirectx_read(Exec::Lda);
static LDA_INDIRECTY: &[Step] = &indirecty_read(Exec::Lda);
static LDX_IMMEDIATE: &[Step] = &immediate(Exec::Ldx);
static LDX_ZEROPAGE: &[Step] = &zeropage_read(Exec::Ldx);
static LDX_ZEROPAGEY: &[Step] = &zeropagey_read(Exec::Ldx);
static LDX_ABSOLUTE: &[Step] = &absolute_read(Exec::Ldx);
static LDX_ABSOLUTEY: &[Step] = &absolutey_read(Exec::Ldx);
static LDY_IMMEDIATE: &[Step] = &immediate(Exec::Ldy);
static LDY_ZEROPAGE: &[Step] = &zeropage_read(Exec::Ldy);
static LDY_ZEROPAGEX: &[Step] = &zeropagex_read(Exec::Ldy);
static LDY_ABSOLUTE: &[Step] = &absolute_read(Exec::Ldy);
static LDY_ABSOLUTEX: &[Step] = &absolutex_read(Exec::Ldy);
static STA_ZEROPAGE: &[Step] = &zeropage_write(Exec::Sta);
static STA_ZEROPAGEX: &[Step] = &zeropagex_write(Exec::Sta);
static STA_ABSOLUTE: &[Step] = &absolute_write(Exec::Sta);
static STA_ABSOLUTEX: &[Step] = &absolutex_write(Exec::Sta);
static STA_ABSOLUTEY: &[Step] = &absolutey_write(Exec::Sta);
static STA_INDIRECTX: &[Step] = &indirectx_write(Exec::Sta);
static STA_INDIRECTY: &[Step] = &indirecty_write(Exec::Sta);
static STX_ZEROPAGE: &[Step] = &zeropage_write(Exec::Stx);
static STX_ZEROPAGEY: &[Step] = &zeropagey_write(Exec::Stx);
static STX_ABSOLUTE: &[Step] = &absolute_write(Exec::Stx);
static STY_ZEROPAGE: &[Step] = &zeropage_write(Exec::Sty);
static STY_ZEROPAGEX: &[Step] = &zeropagex_write(Exec::Sty);
static STY_ABSOLUTE: &[Step] = &absolute_write(Exec::Sty);
static TAX_IMPLIED: &[Step] = &implied(Exec::Tax);
static TAY_IMPLIED: &[Step] = &implied(Exec::Tay);
static TSX_IMPLIED: &[Step] = &implied(Exec::Tsx);
static TXA_IMPLIED: &[Step] = &implied(Exec::Txa);
static TXS_IMPLIED: &[Step] = &implied(Exec::Txs);
static TYA_IMPLIED: &[Step] = &implied(Exec::Tya);

static PHA_IMPLIED: &[Step] = &[
    Step::from(MicroOp::IdleFetch),
    Step::with(MicroOp::Push, Exec::Pha),
];
static PHP_IMPLIED: &[Step] = &[
    Step::from(MicroOp::IdleFetch),
    Step::with(MicroOp::Push, Exec::Php),
];
static PLA_IMPLIED: &[Step] = &[
    Step::from(MicroOp::IdleFetch),
    Step::from(MicroOp::StackIdle),
    Step::with(MicroOp::Pull, Exec::Pla),
];
static PLP_IMPLIED: &[Step] = &[
    Step::from(MicroOp::IdleFetch),
    Step::from(MicroOp::StackIdle),
    Step::with(MicroOp::Pull, Exec::Plp),
];

static ADC_IMMEDIATE: &[Step] = &immediate(Exec::Adc);
static ADC_ZEROPAGE: &[Step] = &zeropage_read(Exec::Adc);
static ADC_ZEROPAGEX: &[Step] = &zeropagex_read(Exec::Adc);
static ADC_ABSOLUTE: &[Step] = &absolute_read(Exec::Adc);
static ADC_ABSOLUTEX: &[Step] = &absolutex_read(Exec::Adc);
static ADC_ABSOLUTEY: &[Step] = &absolutey_read(Exec::Adc);
static ADC_INDIRECTX: &[Step] = &indirectx_read(Exec::Adc);
static ADC_INDIRECTY: &[Step] = &indirecty_read(Exec::Adc);
static SBC_IMMEDIATE: &[Step] = &immediate(Exec::Sbc);
static SBC_ZEROPAGE: &[Step] = &zeropage_read(Exec::Sbc);
static SBC_ZEROPAGEX: &[Step] = &zeropagex_read(Exec::Sbc);
static SBC_ABSOLUTE: &[Step] = &absolute_read(Exec::Sbc);
static SBC_ABSOLUTEX: &[Step] = &absolutex_read(Exec::Sbc);
static SBC_ABSOLUTEY: &[Step] = &absolutey_read(Exec::Sbc);
static SBC_INDIRECTX: &[Step] = &indirectx_read(Exec::Sbc);
static SBC_INDIRECTY: &[Step] = &indirecty_read(Exec::Sbc);
static CMP_IMMEDIATE: &[Step] = &immediate(Exec::Cmp);
static CMP_ZEROPAGE: &[Step] = &zeropage_read(Exec::Cmp);
static CMP_ZEROPAGEX: &[Step] = &zeropagex_read(Exec::Cmp);
static CMP_ABSOLUTE: &[Step] = &absolute_read(Exec::Cmp);
static CMP_ABSOLUTEX: &[Step] = &absolutex_read(Exec::Cmp);
static CMP_ABSOLUTEY: &[Step] = &absolutey_read(Exec::Cmp);
static CMP_INDIRECTX: &[Step] = &indirectx_read(Exec::Cmp);
static CMP_INDIRECTY: &[Step] = &indirecty_read(Exec::Cmp);
static CPX_IMMEDIATE: &[Step] = &immediate(Exec::Cpx);
static CPX_ZEROPAGE: &[Step] = &zeropage_read(Exec::Cpx);
static CPX_ABSOLUTE: &[Step] = &absolute_read(Exec::Cpx);
static CPY_IMMEDIATE: &[Step] = &immediate(Exec::Cpy);
static CPY_ZEROPAGE: &[Step] = &zeropage_read(Exec::Cpy);
static CPY_ABSOLUTE: &[Step] = &absolute_read(Exec::Cpy);
static INC_ZEROPAGE: &[Step] = &zeropage_rmw(Exec::Inc);
static INC_ZEROPAGEX: &[Step] = &zeropagex_rmw(Exec::Inc);
static INC_ABSOLUTE: &[Step] = &absolute_rmw(Exec::Inc);
static INC_ABSOLUTEX: &[Step] = &absolutex_rmw(Exec::Inc);
static DEC_ZEROPAGE: &[Step] = &zeropage_rmw(Exec::Dec);
static DEC_ZEROPAGEX: &[Step] = &zeropagex_rmw(Exec::Dec);
static DEC_ABSOLUTE: &[Step] = &absolute_rmw(Exec::Dec);
static DEC_ABSOLUTEX: &[Step] = &absolutex_rmw(Exec::Dec);
static INX_IMPLIED: &[Step] = &implied(Exec::Inx);
static INY_IMPLIED: &[Step] = &implied(Exec::Iny);
static DEX_IMPLIED: &[Step] = &implied(Exec::Dex);
static DEY_IMPLIED: &[Step] = &implied(Exec::Dey);

static AND_IMMEDIATE: &[Step] = &immediate(Exec::And);
static AND_ZEROPAGE: &[Step] = &zeropage_read(Exec::And);
static AND_ZEROPAGEX: &[Step] = &zeropagex_read(Exec::And);
static AND_ABSOLUTE: &[Step] = &absolute_read(Exec::And);
static AND_ABSOLUTEX: &[Step] = &absolutex_read(Exec::And);
static AND_ABSOLUTEY: &[Step] = &absolutey_read(Exec::And);
static AND_INDIRECTX: &[Step] = &indirectx_read(Exec::And);
static AND_INDIRECTY: &[Step] = &indirecty_read(Exec::And);
static EOR_IMMEDIATE: &[Step] = &immediate(Exec::Eor);
static EOR_ZEROPAGE: &[Step] = &zeropage_read(Exec::Eor);
static EOR_ZEROPAGEX: &[Step] = &zeropagex_read(Exec::Eor);
static EOR_ABSOLUTE: &[Step] = &absolute_read(Exec::Eor);
static EOR_ABSOLUTEX: &[Step] = &absolutex_read(Exec::Eor);
static EOR_ABSOLUTEY: &[Step] = &absolutey_read(Exec::Eor);
static EOR_INDIRECTX: &[Step] = &indirectx_read(Exec::Eor);
static EOR_INDIRECTY: &[Step] = &indirecty_read(Exec::Eor);
static ORA_IMMEDIATE: &[Step] = &immediate(Exec::Ora);
static ORA_ZEROPAGE: &[Step] = &zeropage_read(Exec::Ora);
static ORA_ZEROPAGEX: &[Step] = &zeropagex_read(Exec::Ora);
static ORA_ABSOLUTE: &[Step] = &absolute_read(Exec::Ora);
static ORA_ABSOLUTEX: &[Step] = &absolutex_read(Exec::Ora);
static ORA_ABSOLUTEY: &[Step] = &absolutey_read(Exec::Ora);
static ORA_INDIRECTX: &[Step] = &indirectx_read(Exec::Ora);
static ORA_INDIRECTY: &[Step] = &indirecty_read(Exec::Ora);
static BIT_ZEROPAGE: &[Step] = &zeropage_read(Exec::Bit);
static BIT_ABSOLUTE: &[Step] = &absolute_read(Exec::Bit);

static ASL_ACCUMULATOR: &[Step] = &implied(Exec::AslA);
static ASL_ZEROPAGE: &[Step] = &zeropage_rmw(Exec::Asl);
static ASL_ZEROPAGEX: &[Step] = &zeropagex_rmw(Exec::Asl);
static ASL_ABSOLUTE: &[Step] = &absolute_rmw(Exec::Asl);
static ASL_ABSOLUTEX: &[Step] = &absolutex_rmw(Exec::Asl);
static LSR_ACCUMULATOR: &[Step] = &implied(Exec::LsrA);
static LSR_ZEROPAGE: &[Step] = &zeropage_rmw(Exec::Lsr);
static LSR_ZEROPAGEX: &[Step] = &zeropagex_rmw(Exec::Lsr);
static LSR_ABSOLUTE: &[Step] = &absolute_rmw(Exec::Lsr);
static LSR_ABSOLUTEX: &[Step] = &absolutex_rmw(Exec::Lsr);
static ROL_ACCUMULATOR: &[Step] = &implied(Exec::RolA);
static ROL_ZEROPAGE: &[Step] = &zeropage_rmw(Exec::Rol);
static ROL_ZEROPAGEX: &[Step] = &zeropagex_rmw(Exec::Rol);
static ROL_ABSOLUTE: &[Step] = &absolute_rmw(Exec::Rol);
static ROL_ABSOLUTEX: &[Step] = &absolutex_rmw(Exec::Rol);
static ROR_ACCUMULATOR: &[Step] = &implied(Exec::RorA);
static ROR_ZEROPAGE: &[Step] = &zeropage_rmw(Exec::Ror);
static ROR_ZEROPAGEX: &[Step] = &zeropagex_rmw(Exec::Ror);
static ROR_ABSOLUTE: &[Step] = &absolute_rmw(Exec::Ror);
static ROR_ABSOLUTEX: &[Step] = &absolutex_rmw(Exec::Ror);

static BCC_RELATIVE: &[Step] = &relative(Exec::Bcc);
static BCS_RELATIVE: &[Step] = &relative(Exec::Bcs);
static BEQ_RELATIVE: &[Step] = &relative(Exec::Beq);
static BMI_RELATIVE: &[Step] = &relative(Exec::Bmi);
static BNE_RELATIVE: &[Step] = &relative(Exec::Bne);
static BPL_RELATIVE: &[Step] = &relative(Exec::Bpl);
static BVC_RELATIVE: &[Step] = &relative(Exec::Bvc);
static BVS_RELATIVE: &[Step] = &relative(Exec::Bvs);

static JMP_ABSOLUTE: &[Step] = &[
    Step::from(MicroOp::FetchAdl),
    Step::from(MicroOp::JmpFinish),
];
static JMP_INDIRECT: &[Step] = &[
    Step::from(MicroOp::FetchAdl),
    Step::from(MicroOp::FetchAdh),
    Step::from(MicroOp::FetchIndLo),
    Step::from(MicroOp::FetchIndHi),
];
static JSR_ABSOLUTE: &[Step] = &[
    Step::from(MicroOp::FetchAdl),
    Step::from(MicroOp::StackIdle),
    Step::from(MicroOp::PushPch),
    Step::from(MicroOp::PushPcl),
    Step::from(MicroOp::JmpFinish),
];
static RTS_IMPLIED: &[Step] = &[
    Step::from(MicroOp::IdleFetch),
    Step::from(MicroOp::StackIdle),
    Step::from(MicroOp::PullPcl),
    Step::from(MicroOp::PullPch),
    Step::from(MicroOp::IncPc),
];
static RTI_IMPLIED: &[Step] = &[
    Step::from(MicroOp::IdleFetch),
    Step::from(MicroOp::StackIdle),
    Step::from(MicroOp::PullP),
    Step::from(MicroOp::PullPcl),
    Step::from(MicroOp::PullPch),
];
static BRK_IMPLIED: &[Step] = &[
    Step::with(MicroOp::FetchOperand, Exec::Brk),
    Step::from(MicroOp::PushPch),
    Step::from(MicroOp::PushPclInt),
    Step::from(MicroOp::PushPBrk),
    Step::from(MicroOp::FetchVectorLo),
    Step::from(MicroOp::FetchVectorHi),
];

static CLC_IMPLIED: &[Step] = &implied(Exec::Clc);
static CLD_IMPLIED: &[Step] = &implied(Exec::Cld);
static CLI_IMPLIED: &[Step] = &implied(Exec::Cli);
static CLV_IMPLIED: &[Step] = &implied(Exec::Clv);
static SEC_IMPLIED: &[Step] = &implied(Exec::Sec);
static SED_IMPLIED: &[Step] = &implied(Exec::Sed);
static SEI_IMPLIED: &[Step] = &implied(Exec::Sei);
static NOP_IMPLIED: &[Step] = &implied(Exec::Nop);

// Undocumented opcodes. The NOP variants perform their reads for real since
// I/O registers may have read side effects.

static NOP_IMMEDIATE: &[Step] = &immediate(Exec::Nop);
static NOP_ZEROPAGE: &[Step] = &zeropage_read(Exec::Nop);
static NOP_ZEROPAGEX: &[Step] = &zeropagex_read(Exec::Nop);
static NOP_ABSOLUTE: &[Step] = &absolute_read(Exec::Nop);
static NOP_ABSOLUTEX: &[Step] = &absolutex_read(Exec::Nop);

static SLO_ZEROPAGE: &[Step] = &zeropage_rmw(Exec::Slo);
static SLO_ZEROPAGEX: &[Step] = &zeropagex_rmw(Exec::Slo);
static SLO_ABSOLUTE: &[Step] = &absolute_rmw(Exec::Slo);
static SLO_ABSOLUTEX: &[Step] = &absolutex_rmw(Exec::Slo);
static SLO_ABSOLUTEY: &[Step] = &absolutey_rmw(Exec::Slo);
static SLO_INDIRECTX: &[Step] = &indirectx_rmw(Exec::Slo);
static SLO_INDIRECTY: &[Step] = &indirecty_rmw(Exec::Slo);
static RLA_ZEROPAGE: &[Step] = &zeropage_rmw(Exec::Rla);
static RLA_ZEROPAGEX: &[Step] = &zeropagex_rmw(Exec::Rla);
static RLA_ABSOLUTE: &[Step] = &absolute_rmw(Exec::Rla);
static RLA_ABSOLUTEX: &[Step] = &absolutex_rmw(Exec::Rla);
static RLA_ABSOLUTEY: &[Step] = &absolutey_rmw(Exec::Rla);
static RLA_INDIRECTX: &[Step] = &indirectx_rmw(Exec::Rla);
static RLA_INDIRECTY: &[Step] = &indirecty_rmw(Exec::Rla);
static SRE_ZEROPAGE: &[Step] = &zeropage_rmw(Exec::Sre);
static SRE_ZEROPAGEX: &[Step] = &zeropagex_rmw(Exec::Sre);
static SRE_ABSOLUTE: &[Step] = &absolute_rmw(Exec::Sre);
static SRE_ABSOLUTEX: &[Step] = &absolutex_rmw(Exec::Sre);
static SRE_ABSOLUTEY: &[Step] = &absolutey_rmw(Exec::Sre);
static SRE_INDIRECTX: &[Step] = &indirectx_rmw(Exec::Sre);
static SRE_INDIRECTY: &[Step] = &indirecty_rmw(Exec::Sre);
static RRA_ZEROPAGE: &[Step] = &zeropage_rmw(Exec::Rra);
static RRA_ZEROPAGEX: &[Step] = &zeropagex_rmw(Exec::Rra);
static RRA_ABSOLUTE: &[Step] = &absolute_rmw(Exec::Rra);
static RRA_ABSOLUTEX: &[Step] = &absolutex_rmw(Exec::Rra);
static RRA_ABSOLUTEY: &[Step] = &absolutey_rmw(Exec::Rra);
static RRA_INDIRECTX: &[Step] = &indirectx_rmw(Exec::Rra);
static RRA_INDIRECTY: &[Step] = &indirecty_rmw(Exec::Rra);
static DCP_ZEROPAGE: &[Step] = &zeropage_rmw(Exec::Dcp);
static DCP_ZEROPAGEX: &[Step] = &zeropagex_rmw(Exec::Dcp);
static DCP_ABSOLUTE: &[Step] = &absolute_rmw(Exec::Dcp);
static DCP_ABSOLUTEX: &[Step] = &absolutex_rmw(Exec::Dcp);
static DCP_ABSOLUTEY: &[Step] = &absolutey_rmw(Exec::Dcp);
static DCP_INDIRECTX: &[Step] = &indirectx_rmw(Exec::Dcp);
static DCP_INDIRECTY: &[Step] = &indirecty_rmw(Exec::Dcp);
static ISC_ZEROPAGE: &[Step] = &zeropage_rmw(Exec::Isc);
static ISC_ZEROPAGEX: &[Step] = &zeropagex_rmw(Exec::Isc);
static ISC_ABSOLUTE: &[Step] = &absolute_rmw(Exec::Isc);
static ISC_ABSOLUTEX: &[Step] = &absolutex_rmw(Exec::Isc);
static ISC_ABSOLUTEY: &[Step] = &absolutey_rmw(Exec::Isc);
static ISC_INDIRECTX: &[Step] = &indirectx_rmw(Exec::Isc);
static ISC_INDIRECTY: &[Step] = &indirecty_rmw(Exec::Isc);
static SAX_ZEROPAGE: &[Step] = &zeropage_write(Exec::Sax);
static SAX_ZEROPAGEY: &[Step] = &zeropagey_write(Exec::Sax);
static SAX_ABSOLUTE: &[Step] = &absolute_write(Exec::Sax);
static SAX_INDIRECTX: &[Step] = &indirectx_write(Exec::Sax);
static LAX_ZEROPAGE: &[Step] = &zeropage_read(Exec::Lax);
static LAX_ZEROPAGEY: &[Step] = &zeropagey_read(Exec::Lax);
static LAX_ABSOLUTE: &[Step] = &absolute_read(Exec::Lax);
static LAX_ABSOLUTEY: &[Step] = &absolutey_read(Exec::Lax);
static LAX_INDIRECTX: &[Step] = &indirectx_read(Exec::Lax);
static LAX_INDIRECTY: &[Step] = &indirecty_read(Exec::Lax);
static ANC_IMMEDIATE: &[Step] = &immediate(Exec::Anc);
static ALR_IMMEDIATE: &[Step] = &immediate(Exec::Alr);
static ARR_IMMEDIATE: &[Step] = &immediate(Exec::Arr);
static ANE_IMMEDIATE: &[Step] = &immediate(Exec::Ane);
static LXA_IMMEDIATE: &[Step] = &immediate(Exec::Lxa);
static AXS_IMMEDIATE: &[Step] = &immediate(Exec::Axs);
static LAS_ABSOLUTEY: &[Step] = &absolutey_read(Exec::Las);
static SHA_ABSOLUTEY: &[Step] = &store_quirk_absy(Exec::Sha);
static SHA_INDIRECTY: &[Step] = &store_quirk_indy(Exec::Sha);
static SHX_ABSOLUTEY: &[Step] = &store_quirk_absy(Exec::Shx);
static SHY_ABSOLUTEX: &[Step] = &store_quirk_absx(Exec::Shy);
static TAS_ABSOLUTEY: &[Step] = &store_quirk_absy(Exec::Tas);

static JAM_PROGRAM: &[Step] = &[Step::from(MicroOp::Jam)];

/// The shared programs the executor switches between outside of regular
/// opcode decoding.
pub static FETCH_PROGRAM: &[Step] = &[Step::from(MicroOp::FetchOpcode)];
pub static IRQ_PROGRAM: &[Step] = &[
    Step::from(MicroOp::IdleFetch),
    Step::from(MicroOp::PushPch),
    Step::from(MicroOp::PushPclInt),
    Step::from(MicroOp::PushPInt),
    Step::from(MicroOp::FetchVectorLo),
    Step::from(MicroOp::FetchVectorHi),
];

pub fn decode(opcode: u8) -> &'static [Step] {
    match opcode {
        0x00 => BRK_IMPLIED,
        0x01 => ORA_INDIRECTX,
        0x02 => JAM_PROGRAM,
        0x03 => SLO_INDIRECTX,
        0x04 => NOP_ZEROPAGE,
        0x05 => ORA_ZEROPAGE,
        0x06 => ASL_ZEROPAGE,
        0x07 => SLO_ZEROPAGE,
        0x08 => PHP_IMPLIED,
        0x09 => ORA_IMMEDIATE,
        0x0a => ASL_ACCUMULATOR,
        0x0b => ANC_IMMEDIATE,
        0x0c => NOP_ABSOLUTE,
        0x0d => ORA_ABSOLUTE,
        0x0e => ASL_ABSOLUTE,
        0x0f => SLO_ABSOLUTE,
        0x10 => BPL_RELATIVE,
        0x11 => ORA_INDIRECTY,
        0x12 => JAM_PROGRAM,
        0x13 => SLO_INDIRECTY,
        0x14 => NOP_ZEROPAGEX,
        0x15 => ORA_ZEROPAGEX,
        0x16 => ASL_ZEROPAGEX,
        0x17 => SLO_ZEROPAGEX,
        0x18 => CLC_IMPLIED,
        0x19 => ORA_ABSOLUTEY,
        0x1a => NOP_IMPLIED,
        0x1b => SLO_ABSOLUTEY,
        0x1c => NOP_ABSOLUTEX,
        0x1d => ORA_ABSOLUTEX,
        0x1e => ASL_ABSOLUTEX,
        0x1f => SLO_ABSOLUTEX,
        0x20 => JSR_ABSOLUTE,
        0x21 => AND_INDIRECTX,
        0x22 => JAM_PROGRAM,
        0x23 => RLA_INDIRECTX,
        0x24 => BIT_ZEROPAGE,
        0x25 => AND_ZEROPAGE,
        0x26 => ROL_ZEROPAGE,
        0x27 => RLA_ZEROPAGE,
        0x28 => PLP_IMPLIED,
        0x29 => AND_IMMEDIATE,
        0x2a => ROL_ACCUMULATOR,
        0x2b => ANC_IMMEDIATE,
        0x2c => BIT_ABSOLUTE,
        0x2d => AND_ABSOLUTE,
        0x2e => ROL_ABSOLUTE,
        0x2f => RLA_ABSOLUTE,
        0x30 => BMI_RELATIVE,
        0x31 => AND_INDIRECTY,
        0x32 => JAM_PROGRAM,
        0x33 => RLA_INDIRECTY,
        0x34 => NOP_ZEROPAGEX,
        0x35 => AND_ZEROPAGEX,
        0x36 => ROL_ZEROPAGEX,
        0x37 => RLA_ZEROPAGEX,
        0x38 => SEC_IMPLIED,
        0x39 => AND_ABSOLUTEY,
        0x3a => NOP_IMPLIED,
        0x3b => RLA_ABSOLUTEY,
        0x3c => NOP_ABSOLUTEX,
        0x3d => AND_ABSOLUTEX,
        0x3e => ROL_ABSOLUTEX,
        0x3f => RLA_ABSOLUTEX,
        0x40 => RTI_IMPLIED,
        0x41 => EOR_INDIRECTX,
        0x42 => JAM_PROGRAM,
        0x43 => SRE_INDIRECTX,
        0x44 => NOP_ZEROPAGE,
        0x45 => EOR_ZEROPAGE,
        0x46 => LSR_ZEROPAGE,
        0x47 => SRE_ZEROPAGE,
        0x48 => PHA_IMPLIED,
        0x49 => EOR_IMMEDIATE,
        0x4a => LSR_ACCUMULATOR,
        0x4b => ALR_IMMEDIATE,
        0x4c => JMP_ABSOLUTE,
        0x4d => EOR_ABSOLUTE,
        0x4e => LSR_ABSOLUTE,
        0x4f => SRE_ABSOLUTE,
        0x50 => BVC_RELATIVE,
        0x51 => EOR_INDIRECTY,
        0x52 => JAM_PROGRAM,
        0x53 => SRE_INDIRECTY,
        0x54 => NOP_ZEROPAGEX,
        0x55 => EOR_ZEROPAGEX,
        0x56 => LSR_ZEROPAGEX,
        0x57 => SRE_ZEROPAGEX,
        0x58 => CLI_IMPLIED,
        0x59 => EOR_ABSOLUTEY,
        0x5a => NOP_IMPLIED,
        0x5b => SRE_ABSOLUTEY,
        0x5c => NOP_ABSOLUTEX,
        0x5d => EOR_ABSOLUTEX,
        0x5e => LSR_ABSOLUTEX,
        0x5f => SRE_ABSOLUTEX,
        0x60 => RTS_IMPLIED,
        0x61 => ADC_INDIRECTX,
        0x62 => JAM_PROGRAM,
        0x63 => RRA_INDIRECTX,
        0x64 => NOP_ZEROPAGE,
        0x65 => ADC_ZEROPAGE,
        0x66 => ROR_ZEROPAGE,
        0x67 => RRA_ZEROPAGE,
        0x68 => PLA_IMPLIED,
        0x69 => ADC_IMMEDIATE,
        0x6a => ROR_ACCUMULATOR,
        0x6b => ARR_IMMEDIATE,
        0x6c => JMP_INDIRECT,
        0x6d => ADC_ABSOLUTE,
        0x6e => ROR_ABSOLUTE,
        0x6f => RRA_ABSOLUTE,
        0x70 => BVS_RELATIVE,
        0x71 => ADC_INDIRECTY,
        0x72 => JAM_PROGRAM,
        0x73 => RRA_INDIRECTY,
        0x74 => NOP_ZEROPAGEX,
        0x75 => ADC_ZEROPAGEX,
        0x76 => ROR_ZEROPAGEX,
        0x77 => RRA_ZEROPAGEX,
        0x78 => SEI_IMPLIED,
        0x79 => ADC_ABSOLUTEY,
        0x7a => NOP_IMPLIED,
        0x7b => RRA_ABSOLUTEY,
        0x7c => NOP_ABSOLUTEX,
        0x7d => ADC_ABSOLUTEX,
        0x7e => ROR_ABSOLUTEX,
        0x7f => RRA_ABSOLUTEX,
        0x80 => NOP_IMMEDIATE,
        0x81 => STA_INDIRECTX,
        0x82 => NOP_IMMEDIATE,
        0x83 => SAX_INDIRECTX,
        0x84 => STY_ZEROPAGE,
        0x85 => STA_ZEROPAGE,
        0x86 => STX_ZEROPAGE,
        0x87 => SAX_ZEROPAGE,
        0x88 => DEY_IMPLIED,
        0x89 => NOP_IMMEDIATE,
        0x8a => TXA_IMPLIED,
        0x8b => ANE_IMMEDIATE,
        0x8c => STY_ABSOLUTE,
        0x8d => STA_ABSOLUTE,
        0x8e => STX_ABSOLUTE,
        0x8f => SAX_ABSOLUTE,
        0x90 => BCC_RELATIVE,
        0x91 => STA_INDIRECTY,
        0x92 => JAM_PROGRAM,
        0x93 => SHA_INDIRECTY,
        0x94 => STY_ZEROPAGEX,
        0x95 => STA_ZEROPAGEX,
        0x96 => STX_ZEROPAGEY,
        0x97 => SAX_ZEROPAGEY,
        0x98 => TYA_IMPLIED,
        0x99 => STA_ABSOLUTEY,
        0x9a => TXS_IMPLIED,
        0x9b => TAS_ABSOLUTEY,
        0x9c => SHY_ABSOLUTEX,
        0x9d => STA_ABSOLUTEX,
        0x9e => SHX_ABSOLUTEY,
        0x9f => SHA_ABSOLUTEY,
        0xa0 => LDY_IMMEDIATE,
        0xa1 => LDA_INDIRECTX,
        0xa2 => LDX_IMMEDIATE,
        0xa3 => LAX_INDIRECTX,
        0xa4 => LDY_ZEROPAGE,
        0xa5 => LDA_ZEROPAGE,
        0xa6 => LDX_ZEROPAGE,
        0xa7 => LAX_ZEROPAGE,
        0xa8 => TAY_IMPLIED,
        0xa9 => LDA_IMMEDIATE,
        0xaa => TAX_IMPLIED,
        0xab => LXA_IMMEDIATE,
        0xac => LDY_ABSOLUTE,
        0xad => LDA_ABSOLUTE,
        0xae => LDX_ABSOLUTE,
        0xaf => LAX_ABSOLUTE,
        0xb0 => BCS_RELATIVE,
        0xb1 => LDA_INDIRECTY,
        0xb2 => JAM_PROGRAM,
        0xb3 => LAX_INDIRECTY,
        0xb4 => LDY_ZEROPAGEX,
        0xb5 => LDA_ZEROPAGEX,
        0xb6 => LDX_ZEROPAGEY,
        0xb7 => LAX_ZEROPAGEY,
        0xb8 => CLV_IMPLIED,
        0xb9 => LDA_ABSOLUTEY,
        0xba => TSX_IMPLIED,
        0xbb => LAS_ABSOLUTEY,
        0xbc => LDY_ABSOLUTEX,
        0xbd => LDA_ABSOLUTEX,
        0xbe => LDX_ABSOLUTEY,
        0xbf => LAX_ABSOLUTEY,
        0xc0 => CPY_IMMEDIATE,
        0xc1 => CMP_INDIRECTX,
        0xc2 => NOP_IMMEDIATE,
        0xc3 => DCP_INDIRECTX,
        0xc4 => CPY_ZEROPAGE,
        0xc5 => CMP_ZEROPAGE,
        0xc6 => DEC_ZEROPAGE,
        0xc7 => DCP_ZEROPAGE,
        0xc8 => INY_IMPLIED,
        0xc9 => CMP_IMMEDIATE,
        0xca => DEX_IMPLIED,
        0xcb => AXS_IMMEDIATE,
        0xcc => CPY_ABSOLUTE,
        0xcd => CMP_ABSOLUTE,
        0xce => DEC_ABSOLUTE,
        0xcf => DCP_ABSOLUTE,
        0xd0 => BNE_RELATIVE,
        0xd1 => CMP_INDIRECTY,
        0xd2 => JAM_PROGRAM,
        0xd3 => DCP_INDIRECTY,
        0xd4 => NOP_ZEROPAGEX,
        0xd5 => CMP_ZEROPAGEX,
        0xd6 => DEC_ZEROPAGEX,
        0xd7 => DCP_ZEROPAGEX,
        0xd8 => CLD_IMPLIED,
        0xd9 => CMP_ABSOLUTEY,
        0xda => NOP_IMPLIED,
        0xdb => DCP_ABSOLUTEY,
        0xdc => NOP_ABSOLUTEX,
        0xdd => CMP_ABSOLUTEX,
        0xde => DEC_ABSOLUTEX,
        0xdf => DCP_ABSOLUTEX,
        0xe0 => CPX_IMMEDIATE,
        0xe1 => SBC_INDIRECTX,
        0xe2 => NOP_IMMEDIATE,
        0xe3 => ISC_INDIRECTX,
        0xe4 => CPX_ZEROPAGE,
        0xe5 => SBC_ZEROPAGE,
        0xe6 => INC_ZEROPAGE,
        0xe7 => ISC_ZEROPAGE,
        0xe8 => INX_IMPLIED,
        0xe9 => SBC_IMMEDIATE,
        0xea => NOP_IMPLIED,
        0xeb => SBC_IMMEDIATE,
        0xec => CPX_ABSOLUTE,
        0xed => SBC_ABSOLUTE,
        0xee => INC_ABSOLUTE,
        0xef => ISC_ABSOLUTE,
        0xf0 => BEQ_RELATIVE,
        0xf1 => SBC_INDIRECTY,
        0xf2 => JAM_PROGRAM,
        0xf3 => ISC_INDIRECTY,
        0xf4 => NOP_ZEROPAGEX,
        0xf5 => SBC_ZEROPAGEX,
        0xf6 => INC_ZEROPAGEX,
        0xf7 => ISC_ZEROPAGEX,
        0xf8 => SED_IMPLIED,
        0xf9 => SBC_ABSOLUTEY,
        0xfa => NOP_IMPLIED,
        0xfb => ISC_ABSOLUTEY,
        0xfc => NOP_ABSOLUTEX,
        0xfd => SBC_ABSOLUTEX,
        0xfe => INC_ABSOLUTEX,
        0xff => ISC_ABSOLUTEX,
    }
}

const JAM_OPCODES: [u8; 12] = [
    0x02, 0x12, 0x22, 0x32, 0x42, 0x52, 0x62, 0x72, 0x92, 0xb2, 0xd2, 0xf2,
];

/// Sanity check over the decode table, run once at startup. Every opcode
/// must resolve to a finite program that hands control back to the fetch
/// stage, and only the documented jam opcodes may halt the CPU.
pub fn validate_program_table() -> Result<(), String> {
    for opcode in 0..=255u8 {
        let program = decode(opcode);
        if program.is_empty() || program.len() > 7 {
            return Err(format!("opcode 0x{:02x} has invalid program", opcode));
        }
        let jams = program.iter().any(|step| step.uop == MicroOp::Jam);
        if jams != JAM_OPCODES.contains(&opcode) {
            return Err(format!("opcode 0x{:02x} has invalid jam state", opcode));
        }
        if program[0].uop == MicroOp::FetchOpcode {
            return Err(format!("opcode 0x{:02x} re-enters fetch", opcode));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_is_valid() {
        validate_program_table().unwrap();
    }

    #[test]
    fn documented_lengths() {
        // program length excludes the opcode fetch cycle
        assert_eq!(1, decode(0xea).len()); // NOP
        assert_eq!(6, decode(0x00).len()); // BRK
        assert_eq!(5, decode(0x20).len()); // JSR
        assert_eq!(4, decode(0x6c).len()); // JMP (ind)
        assert_eq!(5, decode(0xfe).len()); // INC abs,x
    }

    #[test]
    fn write_classification() {
        assert!(MicroOp::WriteData.is_write());
        assert!(MicroOp::RmwWriteOld.is_write());
        assert!(MicroOp::PushPch.is_write());
        assert!(!MicroOp::ReadData.is_write());
        assert!(!MicroOp::IdleFetch.is_write());
    }
}
