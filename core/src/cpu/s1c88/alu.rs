//! Flag-deriving arithmetic helpers.
//!
//! Eight-bit add/sub honor the D (decimal) and U (unpacked nibble) flags;
//! sixteen-bit arithmetic is always binary. Signed overflow is computed on
//! widened integers so the flag extraction stays explicit.

use super::{
    CARRY_FLAG, DECIMAL_FLAG, NEGATIVE_FLAG, OVERFLOW_FLAG, S1C88, UNPACK_FLAG, ZERO_FLAG,
};

fn bcd_to_int(value: u8) -> u16 {
    ((value >> 4) as u16) * 10 + (value & 0xF) as u16
}

fn int_to_bcd(value: u16) -> u8 {
    (((value / 10) << 4) | (value % 10)) as u8
}

/// Two's-complement value of a nibble.
fn nibble_signed(value: u8) -> i16 {
    let value = (value & 0xF) as i16;
    if value & 0x8 != 0 { value - 16 } else { value }
}

impl S1C88 {
    fn set_flag(&mut self, flag: u8, set: bool) {
        if set {
            self.sc |= flag;
        } else {
            self.sc &= !flag;
        }
    }

    fn set_zn8(&mut self, result: u8) {
        self.set_flag(ZERO_FLAG, result == 0);
        self.set_flag(NEGATIVE_FLAG, result & 0x80 != 0);
    }

    fn set_zn16(&mut self, result: u16) {
        self.set_flag(ZERO_FLAG, result == 0);
        self.set_flag(NEGATIVE_FLAG, result & 0x8000 != 0);
    }

    fn set_v8(&mut self, wide: i16) {
        self.set_flag(OVERFLOW_FLAG, !(-128..=127).contains(&wide));
    }

    fn set_v4(&mut self, wide: i16) {
        self.set_flag(OVERFLOW_FLAG, !(-8..=7).contains(&wide));
    }

    fn set_v16(&mut self, wide: i32) {
        self.set_flag(OVERFLOW_FLAG, !(-32768..=32767).contains(&wide));
    }

    /// Binary 8-bit add core, shared by ADD and ADC.
    fn add8_binary(&mut self, lhs: u8, rhs: u8, carry_in: u8) -> u8 {
        if self.sc & UNPACK_FLAG != 0 {
            let lhs = lhs & 0xF;
            let rhs = rhs & 0xF;
            let result = lhs + rhs + carry_in;

            self.set_flag(ZERO_FLAG, result == 0);
            self.set_flag(CARRY_FLAG, result >= 0x10);
            self.set_v4(nibble_signed(lhs) + nibble_signed(rhs) + carry_in as i16);
            self.set_flag(NEGATIVE_FLAG, result & 0x8 != 0);
            result
        } else {
            let wide = lhs as u16 + rhs as u16 + carry_in as u16;
            let result = wide as u8;

            self.set_zn8(result);
            self.set_flag(CARRY_FLAG, wide >= 0x100);
            self.set_v8(lhs as i8 as i16 + rhs as i8 as i16 + carry_in as i16);
            result
        }
    }

    /// Decimal 8-bit add core. Operands are decoded as BCD, summed in
    /// integer, and re-encoded modulo 100 (packed) or 10 (unpacked). C is
    /// set when the decimal domain overflows; V and N are cleared.
    fn add8_decimal(&mut self, lhs: u8, rhs: u8, carry_in: u8) -> u8 {
        let unpacked = self.sc & UNPACK_FLAG != 0;
        let (modulus, limit) = if unpacked { (10, 9) } else { (100, 99) };

        let lhs = bcd_to_int(if unpacked { lhs & 0xF } else { lhs });
        let rhs = bcd_to_int(if unpacked { rhs & 0xF } else { rhs });
        let sum = lhs + rhs + carry_in as u16;
        let result = int_to_bcd(sum % modulus);

        self.set_flag(ZERO_FLAG, result == 0);
        self.set_flag(CARRY_FLAG, sum > limit);
        self.sc &= !(OVERFLOW_FLAG | NEGATIVE_FLAG);
        result
    }

    /// Binary 8-bit subtract core, shared by SUB, SBC, and CP.
    fn sub8_binary(&mut self, lhs: u8, rhs: u8, carry_in: u8) -> u8 {
        if self.sc & UNPACK_FLAG != 0 {
            let lhs = lhs & 0xF;
            let rhs = rhs & 0xF;
            let result = lhs.wrapping_sub(rhs).wrapping_sub(carry_in);

            self.set_flag(ZERO_FLAG, result == 0);
            self.set_flag(CARRY_FLAG, rhs as u16 + carry_in as u16 > lhs as u16);
            self.set_v4(nibble_signed(lhs) - nibble_signed(rhs) - carry_in as i16);
            self.set_flag(NEGATIVE_FLAG, result & 0x8 != 0);
            result
        } else {
            let result = lhs.wrapping_sub(rhs).wrapping_sub(carry_in);

            self.set_zn8(result);
            self.set_flag(CARRY_FLAG, rhs as u16 + carry_in as u16 > lhs as u16);
            self.set_v8(lhs as i8 as i16 - rhs as i8 as i16 - carry_in as i16);
            result
        }
    }

    /// Decimal 8-bit subtract core.
    fn sub8_decimal(&mut self, lhs: u8, rhs: u8, carry_in: u8) -> u8 {
        let unpacked = self.sc & UNPACK_FLAG != 0;
        let modulus: i16 = if unpacked { 10 } else { 100 };

        let lhs = bcd_to_int(if unpacked { lhs & 0xF } else { lhs }) as i16;
        let rhs = bcd_to_int(if unpacked { rhs & 0xF } else { rhs }) as i16;
        let diff = lhs - rhs - carry_in as i16;
        let result = int_to_bcd(diff.rem_euclid(modulus) as u16);

        self.set_flag(ZERO_FLAG, result == 0);
        self.set_flag(CARRY_FLAG, diff < 0);
        self.sc &= !(OVERFLOW_FLAG | NEGATIVE_FLAG);
        result
    }

    pub(crate) fn add_u8(&mut self, lhs: u8, rhs: u8) -> u8 {
        if self.sc & DECIMAL_FLAG != 0 {
            self.add8_decimal(lhs, rhs, 0)
        } else {
            self.add8_binary(lhs, rhs, 0)
        }
    }

    pub(crate) fn adc_u8(&mut self, lhs: u8, rhs: u8) -> u8 {
        let carry = (self.sc & CARRY_FLAG != 0) as u8;
        if self.sc & DECIMAL_FLAG != 0 {
            self.add8_decimal(lhs, rhs, carry)
        } else {
            self.add8_binary(lhs, rhs, carry)
        }
    }

    pub(crate) fn sub_u8(&mut self, lhs: u8, rhs: u8) -> u8 {
        if self.sc & DECIMAL_FLAG != 0 {
            self.sub8_decimal(lhs, rhs, 0)
        } else {
            self.sub8_binary(lhs, rhs, 0)
        }
    }

    pub(crate) fn sbc_u8(&mut self, lhs: u8, rhs: u8) -> u8 {
        let carry = (self.sc & CARRY_FLAG != 0) as u8;
        if self.sc & DECIMAL_FLAG != 0 {
            self.sub8_decimal(lhs, rhs, carry)
        } else {
            self.sub8_binary(lhs, rhs, carry)
        }
    }

    /// CP is always a binary packed compare, regardless of D and U.
    pub(crate) fn cp_u8(&mut self, lhs: u8, rhs: u8) {
        let result = lhs.wrapping_sub(rhs);
        self.set_zn8(result);
        self.set_flag(CARRY_FLAG, rhs > lhs);
        self.set_v8(lhs as i8 as i16 - rhs as i8 as i16);
    }

    pub(crate) fn add_u16(&mut self, lhs: u16, rhs: u16) -> u16 {
        let wide = lhs as u32 + rhs as u32;
        let result = wide as u16;

        self.set_zn16(result);
        self.set_flag(CARRY_FLAG, wide >= 0x10000);
        self.set_v16(lhs as i16 as i32 + rhs as i16 as i32);
        result
    }

    pub(crate) fn adc_u16(&mut self, lhs: u16, rhs: u16) -> u16 {
        let carry = (self.sc & CARRY_FLAG != 0) as u32;
        let wide = lhs as u32 + rhs as u32 + carry;
        let result = wide as u16;

        self.set_zn16(result);
        self.set_flag(CARRY_FLAG, wide >= 0x10000);
        self.set_v16(lhs as i16 as i32 + rhs as i16 as i32 + carry as i32);
        result
    }

    pub(crate) fn sub_u16(&mut self, lhs: u16, rhs: u16) -> u16 {
        let result = lhs.wrapping_sub(rhs);

        self.set_zn16(result);
        self.set_flag(CARRY_FLAG, rhs > lhs);
        self.set_v16(lhs as i16 as i32 - rhs as i16 as i32);
        result
    }

    pub(crate) fn sbc_u16(&mut self, lhs: u16, rhs: u16) -> u16 {
        let carry = (self.sc & CARRY_FLAG != 0) as u32;
        let result = lhs.wrapping_sub(rhs).wrapping_sub(carry as u16);

        self.set_zn16(result);
        self.set_flag(CARRY_FLAG, rhs as u32 + carry > lhs as u32);
        self.set_v16(lhs as i16 as i32 - rhs as i16 as i32 - carry as i32);
        result
    }

    pub(crate) fn cp_u16(&mut self, lhs: u16, rhs: u16) {
        let result = lhs.wrapping_sub(rhs);
        self.set_zn16(result);
        self.set_flag(CARRY_FLAG, rhs > lhs);
        self.set_v16(lhs as i16 as i32 - rhs as i16 as i32);
    }

    /// INC/DEC only touch Z.
    pub(crate) fn inc_u8(&mut self, value: u8) -> u8 {
        let result = value.wrapping_add(1);
        self.set_flag(ZERO_FLAG, result == 0);
        result
    }

    pub(crate) fn dec_u8(&mut self, value: u8) -> u8 {
        let result = value.wrapping_sub(1);
        self.set_flag(ZERO_FLAG, result == 0);
        result
    }

    pub(crate) fn inc_u16(&mut self, value: u16) -> u16 {
        let result = value.wrapping_add(1);
        self.set_flag(ZERO_FLAG, result == 0);
        result
    }

    pub(crate) fn dec_u16(&mut self, value: u16) -> u16 {
        let result = value.wrapping_sub(1);
        self.set_flag(ZERO_FLAG, result == 0);
        result
    }

    pub(crate) fn neg_u8(&mut self, value: u8) -> u8 {
        if self.sc & DECIMAL_FLAG != 0 {
            let unpacked = self.sc & UNPACK_FLAG != 0;
            let modulus: u16 = if unpacked { 10 } else { 100 };
            let decoded = bcd_to_int(if unpacked { value & 0xF } else { value });
            let result = int_to_bcd((modulus - decoded % modulus) % modulus);

            self.set_flag(ZERO_FLAG, result == 0);
            self.set_flag(CARRY_FLAG, decoded > 0);
            self.sc &= !(OVERFLOW_FLAG | NEGATIVE_FLAG);
            result
        } else if self.sc & UNPACK_FLAG != 0 {
            let value = value & 0xF;
            let result = 0u8.wrapping_sub(value);

            self.set_flag(ZERO_FLAG, result == 0);
            self.set_flag(CARRY_FLAG, value > 0);
            self.set_v4(-nibble_signed(value));
            self.set_flag(NEGATIVE_FLAG, result & 0x8 != 0);
            result
        } else {
            let result = 0u8.wrapping_sub(value);

            self.set_zn8(result);
            self.set_flag(CARRY_FLAG, value > 0);
            self.set_v8(-(value as i8 as i16));
            result
        }
    }

    /// 8x8 -> 16 multiply. Z and N from the product; V and C cleared.
    pub(crate) fn mlt_u8(&mut self, lhs: u8, rhs: u8) -> u16 {
        let result = lhs as u16 * rhs as u16;
        self.set_zn16(result);
        self.sc &= !(OVERFLOW_FLAG | CARRY_FLAG);
        result
    }

    /// 16/8 divide: quotient in the low byte, remainder in the high byte.
    ///
    /// Divide-by-zero logs and returns the dividend with flags untouched.
    /// A quotient that does not fit in 8 bits sets V and cancels the
    /// operation (the dividend is returned unchanged).
    pub(crate) fn div_u16(&mut self, lhs: u16, rhs: u8) -> u16 {
        if rhs == 0 {
            log::warn!("division by zero at 0x{:04X}", self.log_addr);
            return lhs;
        }

        let quotient = lhs / rhs as u16;
        let remainder = lhs % rhs as u16;
        let result = (remainder << 8) | (quotient & 0xFF);

        self.set_flag(ZERO_FLAG, result == 0);
        self.set_flag(NEGATIVE_FLAG, quotient & 0x80 != 0);
        self.set_flag(OVERFLOW_FLAG, quotient >= 0x100);
        self.sc &= !CARRY_FLAG;

        if quotient >= 0x100 { lhs } else { result }
    }

    pub(crate) fn bit_u8(&mut self, lhs: u8, rhs: u8) {
        let result = lhs & rhs;
        self.set_zn8(result);
    }

    pub(crate) fn and_u8(&mut self, lhs: u8, rhs: u8) -> u8 {
        let result = lhs & rhs;
        self.set_zn8(result);
        result
    }

    pub(crate) fn or_u8(&mut self, lhs: u8, rhs: u8) -> u8 {
        let result = lhs | rhs;
        self.set_zn8(result);
        result
    }

    pub(crate) fn xor_u8(&mut self, lhs: u8, rhs: u8) -> u8 {
        let result = lhs ^ rhs;
        self.set_zn8(result);
        result
    }

    pub(crate) fn cpl_u8(&mut self, value: u8) -> u8 {
        let result = !value;
        self.set_zn8(result);
        result
    }

    pub(crate) fn sll_u8(&mut self, value: u8) -> u8 {
        let result = value << 1;
        self.set_zn8(result);
        self.set_flag(CARRY_FLAG, value & 0x80 != 0);
        result
    }

    pub(crate) fn sla_u8(&mut self, value: u8) -> u8 {
        let result = value << 1;
        self.set_zn8(result);
        self.set_flag(OVERFLOW_FLAG, (value as u16) << 1 >= 0x100);
        self.set_flag(CARRY_FLAG, value & 0x80 != 0);
        result
    }

    pub(crate) fn srl_u8(&mut self, value: u8) -> u8 {
        let result = value >> 1;
        self.set_flag(ZERO_FLAG, result == 0);
        self.set_flag(CARRY_FLAG, value & 0x01 != 0);
        self.sc &= !NEGATIVE_FLAG;
        result
    }

    pub(crate) fn sra_u8(&mut self, value: u8) -> u8 {
        let result = (value >> 1) | (value & 0x80);
        self.set_zn8(result);
        self.set_flag(CARRY_FLAG, value & 0x01 != 0);
        self.sc &= !OVERFLOW_FLAG;
        result
    }

    pub(crate) fn rlc_u8(&mut self, value: u8) -> u8 {
        let result = value.rotate_left(1);
        self.set_zn8(result);
        self.set_flag(CARRY_FLAG, value & 0x80 != 0);
        result
    }

    pub(crate) fn rl_u8(&mut self, value: u8) -> u8 {
        let carry_in = (self.sc & CARRY_FLAG != 0) as u8;
        let result = (value << 1) | carry_in;
        self.set_zn8(result);
        self.set_flag(CARRY_FLAG, value & 0x80 != 0);
        result
    }

    pub(crate) fn rrc_u8(&mut self, value: u8) -> u8 {
        let result = value.rotate_right(1);
        self.set_zn8(result);
        self.set_flag(CARRY_FLAG, value & 0x01 != 0);
        result
    }

    pub(crate) fn rr_u8(&mut self, value: u8) -> u8 {
        let carry_in = (self.sc & CARRY_FLAG != 0) as u8;
        let result = (value >> 1) | (carry_in << 7);
        self.set_zn8(result);
        self.set_flag(CARRY_FLAG, value & 0x01 != 0);
        result
    }
}
