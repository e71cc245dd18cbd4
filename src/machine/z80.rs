use super::{Machine, MachineState, StepResult};
use crate::loader::BinaryImage;
use log::trace;

const FLAG_S: u8 = 0x80;
const FLAG_Z: u8 = 0x40;
const FLAG_Y: u8 = 0x20;
const FLAG_H: u8 = 0x10;
const FLAG_X: u8 = 0x08;
const FLAG_P: u8 = 0x04;
const FLAG_N: u8 = 0x02;
const FLAG_C: u8 = 0x01;

/// Register (HL) in the `r` operand encoding.
const R_HL_INDIRECT: u8 = 6;

/// The main register file, as shown to a front end.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Z80Registers {
    pub pc: u16,
    pub sp: u16,
    pub a: u8,
    pub f: u8,
    pub b: u8,
    pub c: u8,
    pub d: u8,
    pub e: u8,
    pub h: u8,
    pub l: u8,
    pub ix: u16,
    pub iy: u16,
    pub i: u8,
    pub r: u8,
}

impl Z80Registers {
    pub fn flags(&self) -> Flags {
        Flags::from_byte(self.f)
    }

    fn bc(&self) -> u16 {
        u16::from_be_bytes([self.b, self.c])
    }

    fn de(&self) -> u16 {
        u16::from_be_bytes([self.d, self.e])
    }

    fn hl(&self) -> u16 {
        u16::from_be_bytes([self.h, self.l])
    }

    fn set_hl(&mut self, value: u16) {
        [self.h, self.l] = value.to_be_bytes();
    }
}

/// The F register unpacked into its eight bits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Flags {
    pub sign: bool,
    pub zero: bool,
    pub y: bool,
    pub half_carry: bool,
    pub x: bool,
    pub parity_overflow: bool,
    pub subtract: bool,
    pub carry: bool,
}

impl Flags {
    pub fn from_byte(f: u8) -> Self {
        Self {
            sign: f & FLAG_S != 0,
            zero: f & FLAG_Z != 0,
            y: f & FLAG_Y != 0,
            half_carry: f & FLAG_H != 0,
            x: f & FLAG_X != 0,
            parity_overflow: f & FLAG_P != 0,
            subtract: f & FLAG_N != 0,
            carry: f & FLAG_C != 0,
        }
    }

    pub fn to_byte(self) -> u8 {
        [
            (self.sign, FLAG_S),
            (self.zero, FLAG_Z),
            (self.y, FLAG_Y),
            (self.half_carry, FLAG_H),
            (self.x, FLAG_X),
            (self.parity_overflow, FLAG_P),
            (self.subtract, FLAG_N),
            (self.carry, FLAG_C),
        ]
        .iter()
        .filter(|(set, _)| *set)
        .fold(0, |acc, (_, bit)| acc | bit)
    }
}

#[derive(Clone, Copy)]
enum Index {
    Ix,
    Iy,
}

/// Z80-class CPU executing out of a 64 KiB memory image.
///
/// Halts on `HALT` (pc stays on the opcode) or once pc leaves the loaded
/// image, i.e. reaches one past the highest byte a data record wrote.
#[derive(Debug, Clone)]
pub struct Z80Cpu {
    image: BinaryImage,
    memory: Box<[u8]>,
    regs: Z80Registers,
    /// A', F', B', C', D', E', H', L'
    shadow: [u8; 8],
    iff: bool,
    interrupt_mode: u8,
    entry: u16,
    halted: bool,
    wrapped: bool,
}

impl Z80Cpu {
    /// `entry` defaults to the image's start address.
    pub fn new(image: BinaryImage, entry: Option<u16>) -> Self {
        let entry = entry.unwrap_or(image.start_address);
        let memory = image.memory().into();
        let mut cpu = Self {
            image,
            memory,
            regs: Z80Registers::default(),
            shadow: [0; 8],
            iff: false,
            interrupt_mode: 0,
            entry,
            halted: false,
            wrapped: false,
        };
        cpu.reset();
        cpu
    }

    pub fn registers(&self) -> Z80Registers {
        self.regs
    }

    pub fn read(&self, address: u16) -> u8 {
        self.memory[address as usize]
    }

    pub fn entry(&self) -> u16 {
        self.entry
    }

    pub fn interrupts_enabled(&self) -> bool {
        self.iff
    }

    pub fn interrupt_mode(&self) -> u8 {
        self.interrupt_mode
    }

    fn past_end(&self) -> bool {
        self.wrapped || self.regs.pc as usize >= self.image.end_address
    }

    fn write(&mut self, address: u16, value: u8) {
        self.memory[address as usize] = value;
    }

    fn read16(&self, address: u16) -> u16 {
        u16::from_le_bytes([self.read(address), self.read(address.wrapping_add(1))])
    }

    fn write16(&mut self, address: u16, value: u16) {
        let [lo, hi] = value.to_le_bytes();
        self.write(address, lo);
        self.write(address.wrapping_add(1), hi);
    }

    fn fetch(&mut self) -> u8 {
        let value = self.read(self.regs.pc);
        if self.regs.pc == u16::MAX {
            self.wrapped = true;
        }
        self.regs.pc = self.regs.pc.wrapping_add(1);
        value
    }

    fn fetch16(&mut self) -> u16 {
        u16::from_le_bytes([self.fetch(), self.fetch()])
    }

    fn push(&mut self, value: u16) {
        self.regs.sp = self.regs.sp.wrapping_sub(2);
        self.write16(self.regs.sp, value);
    }

    fn pop(&mut self) -> u16 {
        let value = self.read16(self.regs.sp);
        self.regs.sp = self.regs.sp.wrapping_add(2);
        value
    }

    fn flag(&self, bit: u8) -> bool {
        self.regs.f & bit != 0
    }

    fn set_flag(&mut self, bit: u8, on: bool) {
        if on {
            self.regs.f |= bit;
        } else {
            self.regs.f &= !bit;
        }
    }

    fn reg8(&self, r: u8) -> u8 {
        match r {
            0 => self.regs.b,
            1 => self.regs.c,
            2 => self.regs.d,
            3 => self.regs.e,
            4 => self.regs.h,
            5 => self.regs.l,
            R_HL_INDIRECT => self.read(self.regs.hl()),
            _ => self.regs.a,
        }
    }

    fn set_reg8(&mut self, r: u8, value: u8) {
        match r {
            0 => self.regs.b = value,
            1 => self.regs.c = value,
            2 => self.regs.d = value,
            3 => self.regs.e = value,
            4 => self.regs.h = value,
            5 => self.regs.l = value,
            R_HL_INDIRECT => self.write(self.regs.hl(), value),
            _ => self.regs.a = value,
        }
    }

    /// BC, DE, HL, SP
    fn reg16(&self, p: u8) -> u16 {
        match p {
            0 => self.regs.bc(),
            1 => self.regs.de(),
            2 => self.regs.hl(),
            _ => self.regs.sp,
        }
    }

    fn set_reg16(&mut self, p: u8, value: u16) {
        let [hi, lo] = value.to_be_bytes();
        match p {
            0 => (self.regs.b, self.regs.c) = (hi, lo),
            1 => (self.regs.d, self.regs.e) = (hi, lo),
            2 => (self.regs.h, self.regs.l) = (hi, lo),
            _ => self.regs.sp = value,
        }
    }

    /// BC, DE, HL, AF as used by PUSH and POP.
    fn reg16_af(&self, p: u8) -> u16 {
        if p == 3 {
            u16::from_be_bytes([self.regs.a, self.regs.f])
        } else {
            self.reg16(p)
        }
    }

    fn set_reg16_af(&mut self, p: u8, value: u16) {
        if p == 3 {
            [self.regs.a, self.regs.f] = value.to_be_bytes();
        } else {
            self.set_reg16(p, value);
        }
    }

    fn condition(&self, cc: u8) -> bool {
        match cc {
            0 => !self.flag(FLAG_Z),
            1 => self.flag(FLAG_Z),
            2 => !self.flag(FLAG_C),
            3 => self.flag(FLAG_C),
            4 => !self.flag(FLAG_P),
            5 => self.flag(FLAG_P),
            6 => !self.flag(FLAG_S),
            _ => self.flag(FLAG_S),
        }
    }

    fn index(&self, index: Index) -> u16 {
        match index {
            Index::Ix => self.regs.ix,
            Index::Iy => self.regs.iy,
        }
    }

    fn set_index(&mut self, index: Index, value: u16) {
        match index {
            Index::Ix => self.regs.ix = value,
            Index::Iy => self.regs.iy = value,
        }
    }

    fn bump_refresh(&mut self) {
        let r = self.regs.r;
        self.regs.r = (r & 0x80) | (r.wrapping_add(1) & 0x7F);
    }

    fn execute(&mut self, op: u8) {
        let x = op >> 6;
        let y = (op >> 3) & 7;
        let z = op & 7;
        let p = y >> 1;
        let q = y & 1;

        match (x, z) {
            (0, 0) => match y {
                0 => {}
                1 => self.ex_af(),
                2 => {
                    let d = self.fetch() as i8;
                    self.regs.b = self.regs.b.wrapping_sub(1);
                    if self.regs.b != 0 {
                        self.jump_relative(d);
                    }
                }
                3 => {
                    let d = self.fetch() as i8;
                    self.jump_relative(d);
                }
                _ => {
                    let d = self.fetch() as i8;
                    if self.condition(y - 4) {
                        self.jump_relative(d);
                    }
                }
            },
            (0, 1) => {
                if q == 0 {
                    let value = self.fetch16();
                    self.set_reg16(p, value);
                } else {
                    let result = self.add16(self.regs.hl(), self.reg16(p));
                    self.regs.set_hl(result);
                }
            }
            (0, 2) => self.indirect_load(p, q),
            (0, 3) => {
                let value = self.reg16(p);
                let value = if q == 0 {
                    value.wrapping_add(1)
                } else {
                    value.wrapping_sub(1)
                };
                self.set_reg16(p, value);
            }
            (0, 4) => {
                let value = self.inc8(self.reg8(y));
                self.set_reg8(y, value);
            }
            (0, 5) => {
                let value = self.dec8(self.reg8(y));
                self.set_reg8(y, value);
            }
            (0, 6) => {
                let value = self.fetch();
                self.set_reg8(y, value);
            }
            (0, _) => self.accumulator_op(y),
            (1, _) => {
                if y == R_HL_INDIRECT && z == R_HL_INDIRECT {
                    self.halted = true;
                    self.regs.pc = self.regs.pc.wrapping_sub(1);
                } else {
                    let value = self.reg8(z);
                    self.set_reg8(y, value);
                }
            }
            (2, _) => self.alu(y, self.reg8(z)),
            (_, 0) => {
                if self.condition(y) {
                    self.regs.pc = self.pop();
                }
            }
            (_, 1) => {
                if q == 0 {
                    let value = self.pop();
                    self.set_reg16_af(p, value);
                } else {
                    match p {
                        0 => self.regs.pc = self.pop(),
                        1 => self.exx(),
                        2 => self.regs.pc = self.regs.hl(),
                        _ => self.regs.sp = self.regs.hl(),
                    }
                }
            }
            (_, 2) => {
                let target = self.fetch16();
                if self.condition(y) {
                    self.regs.pc = target;
                }
            }
            (_, 3) => match y {
                0 => self.regs.pc = self.fetch16(),
                1 => {
                    let op = self.fetch();
                    self.execute_cb(op);
                }
                // OUT (n),A and IN A,(n): no devices attached.
                2 | 3 => {
                    let _port = self.fetch();
                }
                4 => {
                    let sp = self.regs.sp;
                    let value = self.read16(sp);
                    self.write16(sp, self.regs.hl());
                    self.regs.set_hl(value);
                }
                5 => {
                    let (de, hl) = (self.regs.de(), self.regs.hl());
                    self.set_reg16(1, hl);
                    self.regs.set_hl(de);
                }
                6 => self.iff = false,
                _ => self.iff = true,
            },
            (_, 4) => {
                let target = self.fetch16();
                if self.condition(y) {
                    self.push(self.regs.pc);
                    self.regs.pc = target;
                }
            }
            (_, 5) => {
                if q == 0 {
                    self.push(self.reg16_af(p));
                } else {
                    match p {
                        0 => {
                            let target = self.fetch16();
                            self.push(self.regs.pc);
                            self.regs.pc = target;
                        }
                        1 => {
                            let op = self.fetch();
                            self.execute_indexed(Index::Ix, op);
                        }
                        2 => {
                            let op = self.fetch();
                            self.execute_ed(op);
                        }
                        _ => {
                            let op = self.fetch();
                            self.execute_indexed(Index::Iy, op);
                        }
                    }
                }
            }
            (_, 6) => {
                let value = self.fetch();
                self.alu(y, value);
            }
            _ => {
                self.push(self.regs.pc);
                self.regs.pc = u16::from(y) * 8;
            }
        }
    }

    fn jump_relative(&mut self, offset: i8) {
        self.regs.pc = self.regs.pc.wrapping_add_signed(i16::from(offset));
    }

    fn ex_af(&mut self) {
        std::mem::swap(&mut self.regs.a, &mut self.shadow[0]);
        std::mem::swap(&mut self.regs.f, &mut self.shadow[1]);
    }

    fn exx(&mut self) {
        let regs = &mut self.regs;
        for (main, alt) in [
            &mut regs.b,
            &mut regs.c,
            &mut regs.d,
            &mut regs.e,
            &mut regs.h,
            &mut regs.l,
        ]
        .into_iter()
        .zip(self.shadow[2..].iter_mut())
        {
            std::mem::swap(main, alt);
        }
    }

    fn indirect_load(&mut self, p: u8, q: u8) {
        match (q, p) {
            (0, 0) => self.write(self.regs.bc(), self.regs.a),
            (0, 1) => self.write(self.regs.de(), self.regs.a),
            (0, 2) => {
                let address = self.fetch16();
                self.write16(address, self.regs.hl());
            }
            (0, _) => {
                let address = self.fetch16();
                self.write(address, self.regs.a);
            }
            (_, 0) => self.regs.a = self.read(self.regs.bc()),
            (_, 1) => self.regs.a = self.read(self.regs.de()),
            (_, 2) => {
                let address = self.fetch16();
                let value = self.read16(address);
                self.regs.set_hl(value);
            }
            _ => {
                let address = self.fetch16();
                self.regs.a = self.read(address);
            }
        }
    }

    fn accumulator_op(&mut self, y: u8) {
        let a = self.regs.a;
        let carry = self.flag(FLAG_C);
        match y {
            0 => {
                self.regs.a = a.rotate_left(1);
                self.set_flag(FLAG_C, a & 0x80 != 0);
            }
            1 => {
                self.regs.a = a.rotate_right(1);
                self.set_flag(FLAG_C, a & 0x01 != 0);
            }
            2 => {
                self.regs.a = (a << 1) | u8::from(carry);
                self.set_flag(FLAG_C, a & 0x80 != 0);
            }
            3 => {
                self.regs.a = (a >> 1) | (u8::from(carry) << 7);
                self.set_flag(FLAG_C, a & 0x01 != 0);
            }
            // DAA: decimal adjust is not modelled.
            4 => return,
            5 => {
                self.regs.a = !a;
                self.set_flag(FLAG_H, true);
                self.set_flag(FLAG_N, true);
                self.set_undocumented(self.regs.a);
                return;
            }
            6 => {
                self.set_flag(FLAG_C, true);
                self.set_flag(FLAG_H, false);
            }
            _ => self.set_flag(FLAG_C, !carry),
        }
        // CCF moves the old carry into H; everything else clears it.
        self.set_flag(FLAG_H, y == 7 && carry);
        self.set_flag(FLAG_N, false);
        self.set_undocumented(self.regs.a);
    }

    fn set_undocumented(&mut self, value: u8) {
        self.regs.f = (self.regs.f & !(FLAG_Y | FLAG_X)) | (value & (FLAG_Y | FLAG_X));
    }

    /// S, Z, Y, X from `value`, everything else cleared.
    fn sz_flags(value: u8) -> u8 {
        let mut f = value & (FLAG_S | FLAG_Y | FLAG_X);
        if value == 0 {
            f |= FLAG_Z;
        }
        f
    }

    fn parity(value: u8) -> u8 {
        if value.count_ones() % 2 == 0 {
            FLAG_P
        } else {
            0
        }
    }

    fn alu(&mut self, op: u8, value: u8) {
        let a = self.regs.a;
        let carry = self.flag(FLAG_C);
        match op {
            0 => self.regs.a = self.add8(a, value, false),
            1 => self.regs.a = self.add8(a, value, carry),
            2 => self.regs.a = self.sub8(a, value, false),
            3 => self.regs.a = self.sub8(a, value, carry),
            4 => {
                self.regs.a = a & value;
                self.regs.f = Self::sz_flags(self.regs.a) | FLAG_H | Self::parity(self.regs.a);
            }
            5 => {
                self.regs.a = a ^ value;
                self.regs.f = Self::sz_flags(self.regs.a) | Self::parity(self.regs.a);
            }
            6 => {
                self.regs.a = a | value;
                self.regs.f = Self::sz_flags(self.regs.a) | Self::parity(self.regs.a);
            }
            _ => {
                let _ = self.sub8(a, value, false);
                // CP takes Y and X from the operand.
                self.set_undocumented(value);
            }
        }
    }

    fn add8(&mut self, a: u8, value: u8, carry: bool) -> u8 {
        let sum = u16::from(a) + u16::from(value) + u16::from(carry);
        let result = sum as u8;
        let mut f = Self::sz_flags(result);
        if (a ^ value ^ result) & 0x10 != 0 {
            f |= FLAG_H;
        }
        if (a ^ result) & (value ^ result) & 0x80 != 0 {
            f |= FLAG_P;
        }
        if sum > 0xFF {
            f |= FLAG_C;
        }
        self.regs.f = f;
        result
    }

    fn sub8(&mut self, a: u8, value: u8, carry: bool) -> u8 {
        let subtrahend = u16::from(value) + u16::from(carry);
        let result = a.wrapping_sub(value).wrapping_sub(u8::from(carry));
        let mut f = Self::sz_flags(result) | FLAG_N;
        if (a ^ value ^ result) & 0x10 != 0 {
            f |= FLAG_H;
        }
        if (a ^ value) & (a ^ result) & 0x80 != 0 {
            f |= FLAG_P;
        }
        if u16::from(a) < subtrahend {
            f |= FLAG_C;
        }
        self.regs.f = f;
        result
    }

    fn inc8(&mut self, value: u8) -> u8 {
        let result = value.wrapping_add(1);
        let mut f = Self::sz_flags(result) | (self.regs.f & FLAG_C);
        if value & 0x0F == 0x0F {
            f |= FLAG_H;
        }
        if value == 0x7F {
            f |= FLAG_P;
        }
        self.regs.f = f;
        result
    }

    fn dec8(&mut self, value: u8) -> u8 {
        let result = value.wrapping_sub(1);
        let mut f = Self::sz_flags(result) | FLAG_N | (self.regs.f & FLAG_C);
        if value & 0x0F == 0 {
            f |= FLAG_H;
        }
        if value == 0x80 {
            f |= FLAG_P;
        }
        self.regs.f = f;
        result
    }

    fn add16(&mut self, lhs: u16, rhs: u16) -> u16 {
        let sum = u32::from(lhs) + u32::from(rhs);
        let result = sum as u16;
        let kept = self.regs.f & (FLAG_S | FLAG_Z | FLAG_P);
        let mut f = kept | ((result >> 8) as u8 & (FLAG_Y | FLAG_X));
        if (lhs ^ rhs ^ result) & 0x1000 != 0 {
            f |= FLAG_H;
        }
        if sum > 0xFFFF {
            f |= FLAG_C;
        }
        self.regs.f = f;
        result
    }

    fn execute_cb(&mut self, op: u8) {
        let z = op & 7;
        if let Some(result) = self.bit_op(op, self.reg8(z)) {
            self.set_reg8(z, result);
        }
    }

    /// Rotate/shift, BIT, RES or SET on `value`; `None` when only flags change.
    fn bit_op(&mut self, op: u8, value: u8) -> Option<u8> {
        let x = op >> 6;
        let y = (op >> 3) & 7;

        match x {
            0 => {
                let carry_in = u8::from(self.flag(FLAG_C));
                let (result, carry_out) = match y {
                    0 => (value.rotate_left(1), value >> 7),
                    1 => (value.rotate_right(1), value & 1),
                    2 => ((value << 1) | carry_in, value >> 7),
                    3 => ((value >> 1) | (carry_in << 7), value & 1),
                    4 => (value << 1, value >> 7),
                    5 => ((value >> 1) | (value & 0x80), value & 1),
                    6 => ((value << 1) | 1, value >> 7),
                    _ => (value >> 1, value & 1),
                };
                self.regs.f = Self::sz_flags(result) | Self::parity(result) | carry_out;
                Some(result)
            }
            1 => {
                let set = value & (1 << y) != 0;
                let mut f = (self.regs.f & FLAG_C) | FLAG_H | (value & (FLAG_Y | FLAG_X));
                if !set {
                    f |= FLAG_Z | FLAG_P;
                }
                if set && y == 7 {
                    f |= FLAG_S;
                }
                self.regs.f = f;
                None
            }
            2 => Some(value & !(1 << y)),
            _ => Some(value | (1 << y)),
        }
    }

    /// Address of an `(IX+d)` / `(IY+d)` operand, consuming the displacement.
    fn displaced(&mut self, index: Index) -> u16 {
        let d = self.fetch() as i8;
        self.index(index).wrapping_add_signed(i16::from(d))
    }

    fn execute_indexed(&mut self, index: Index, op: u8) {
        let x = op >> 6;
        let y = (op >> 3) & 7;
        let z = op & 7;

        match op {
            0x21 => {
                let value = self.fetch16();
                self.set_index(index, value);
            }
            0x23 => self.set_index(index, self.index(index).wrapping_add(1)),
            0x2B => self.set_index(index, self.index(index).wrapping_sub(1)),
            0x34 | 0x35 => {
                let address = self.displaced(index);
                let value = self.read(address);
                let value = if op == 0x34 {
                    self.inc8(value)
                } else {
                    self.dec8(value)
                };
                self.write(address, value);
            }
            0x36 => {
                let address = self.displaced(index);
                let value = self.fetch();
                self.write(address, value);
            }
            0xCB => {
                // DD CB d op: the displacement comes before the sub-opcode.
                let address = self.displaced(index);
                let sub = self.fetch();
                if let Some(result) = self.bit_op(sub, self.read(address)) {
                    self.write(address, result);
                }
            }
            0xE1 => {
                let value = self.pop();
                self.set_index(index, value);
            }
            0xE5 => self.push(self.index(index)),
            0xE9 => self.regs.pc = self.index(index),
            0xF9 => self.regs.sp = self.index(index),
            // LD r,(IX+d) and LD (IX+d),r; DD 76 is not one of them.
            _ if x == 1 && (y == R_HL_INDIRECT) != (z == R_HL_INDIRECT) => {
                let address = self.displaced(index);
                if z == R_HL_INDIRECT {
                    let value = self.read(address);
                    self.set_reg8(y, value);
                } else {
                    self.write(address, self.reg8(z));
                }
            }
            _ if x == 2 && z == R_HL_INDIRECT => {
                let address = self.displaced(index);
                let value = self.read(address);
                self.alu(y, value);
            }
            _ => trace!("Unmodelled indexed opcode {:02X}", op),
        }
    }

    fn execute_ed(&mut self, op: u8) {
        let x = op >> 6;
        let y = (op >> 3) & 7;
        let z = op & 7;
        let p = y >> 1;
        let q = y & 1;

        match (x, z, y) {
            (1, 3, _) => {
                let address = self.fetch16();
                if q == 0 {
                    self.write16(address, self.reg16(p));
                } else {
                    let value = self.read16(address);
                    self.set_reg16(p, value);
                }
            }
            (1, 4, _) => self.regs.a = self.sub8(0, self.regs.a, false),
            (1, 6, _) => self.interrupt_mode = [0, 0, 1, 2][(y & 3) as usize],
            (1, 7, 0) => self.regs.i = self.regs.a,
            (1, 7, 2) => {
                self.regs.a = self.regs.i;
                let f = Self::sz_flags(self.regs.a) | (self.regs.f & FLAG_C);
                self.regs.f = if self.iff { f | FLAG_P } else { f };
            }
            _ => trace!("Unmodelled ED opcode {:02X}", op),
        }
    }
}

impl Machine for Z80Cpu {
    fn reset(&mut self) {
        self.memory.copy_from_slice(self.image.memory());
        self.regs = Z80Registers {
            pc: self.entry,
            sp: 0xFFFF,
            ..Z80Registers::default()
        };
        self.shadow = [0; 8];
        self.iff = false;
        self.interrupt_mode = 0;
        self.wrapped = false;
        // An entry outside the loaded image has nothing to execute.
        self.halted = self.past_end();
    }

    fn step(&mut self) -> StepResult {
        if self.halted || self.past_end() {
            self.halted = true;
            return self.snapshot();
        }

        let op = self.fetch();
        self.bump_refresh();
        self.execute(op);

        if self.past_end() {
            self.halted = true;
        }
        self.snapshot()
    }

    fn pc(&self) -> usize {
        self.regs.pc as usize
    }

    fn state(&self) -> MachineState {
        MachineState::Registers(self.regs)
    }

    fn is_halted(&self) -> bool {
        self.halted
    }
}
