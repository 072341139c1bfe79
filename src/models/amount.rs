use crate::error::AmountError;
use bigdecimal::BigDecimal;
use serde::{Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// 两位小数的定点金额
///
/// 内部始终保持 scale = 2，因此相等比较与哈希都是精确的十进制比较。
/// 第三位及以后的非零小数会被拒绝，而不是四舍五入。
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Amount(BigDecimal);

impl Amount {
    pub const SCALE: i64 = 2;

    /// 从原始单元格文本解析金额
    ///
    /// 接受可选符号、可选的前导 `$` 以及 `,` 千分位分隔符，
    /// 与报表输出的货币格式保持可回读。
    pub fn parse(raw: &str) -> Result<Self, AmountError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(AmountError::Empty);
        }

        let (negative, rest) = match trimmed.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, trimmed.strip_prefix('+').unwrap_or(trimmed)),
        };
        let rest = rest.strip_prefix('$').unwrap_or(rest);
        let digits: String = rest.chars().filter(|c| *c != ',').collect();
        // 只接受 digits[.digits]，不接受指数写法
        if !is_plain_decimal(&digits) {
            return Err(AmountError::Invalid(trimmed.to_string()));
        }

        let value = BigDecimal::from_str(&digits)
            .map_err(|_| AmountError::Invalid(trimmed.to_string()))?;
        let value = if negative { -value } else { value };

        Self::from_decimal(value).map_err(|_| AmountError::ExcessPrecision(trimmed.to_string()))
    }

    /// 校验精度后包装十进制值
    pub fn from_decimal(value: BigDecimal) -> Result<Self, AmountError> {
        let scaled = value.with_scale(Self::SCALE);
        if scaled != value {
            return Err(AmountError::ExcessPrecision(value.to_string()));
        }
        Ok(Self(scaled))
    }

    /// 以分为单位构造
    pub fn from_cents(cents: i64) -> Self {
        let value = BigDecimal::from(cents) / BigDecimal::from(100);
        Self(value.with_scale(Self::SCALE))
    }

    pub fn as_decimal(&self) -> &BigDecimal {
        &self.0
    }
}

fn is_plain_decimal(text: &str) -> bool {
    let (int_part, frac_part) = match text.split_once('.') {
        Some((int_part, frac_part)) => (int_part, frac_part),
        None => (text, ""),
    };
    !(int_part.is_empty() && frac_part.is_empty())
        && int_part.bytes().all(|b| b.is_ascii_digit())
        && frac_part.bytes().all(|b| b.is_ascii_digit())
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Amount {
    type Err = AmountError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for Amount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&self.0)
    }
}
