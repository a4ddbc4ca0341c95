//! 敏感信息类别定义
//!
//! 类别集合是封闭的：每个类别对应一条固定的检测规则
//! （正则模式 + 校验 + 归一化，见 veil-rules）。

use serde::{Deserialize, Serialize};

/// 敏感信息类别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    /// Aadhaar 号（印度身份证号，12 位数字）
    Aadhaar,
    /// PAN 号（印度税号，5 字母 + 4 数字 + 1 字母）
    #[serde(rename = "PAN")]
    Pan,
    /// 手机号（10 位，可带 +91 国家码）
    Phone,
    /// 邮箱地址
    Email,
    /// 银行账号（9-18 位数字）
    #[serde(rename = "Bank_Account")]
    BankAccount,
    /// 信用卡/借记卡号（16 位数字）
    #[serde(rename = "Credit_Debit_Card")]
    CreditDebitCard,
}

impl Category {
    /// 全部类别，按固定顺序
    pub const ALL: [Category; 6] = [
        Category::Aadhaar,
        Category::Pan,
        Category::Phone,
        Category::Email,
        Category::BankAccount,
        Category::CreditDebitCard,
    ];

    /// 对外使用的类别名称（检测结果与脱敏请求的 map key）
    pub fn name(&self) -> &'static str {
        match self {
            Category::Aadhaar => "Aadhaar",
            Category::Pan => "PAN",
            Category::Phone => "Phone",
            Category::Email => "Email",
            Category::BankAccount => "Bank_Account",
            Category::CreditDebitCard => "Credit_Debit_Card",
        }
    }

    /// 从类别名称解析
    pub fn from_name(name: &str) -> Option<Category> {
        Category::ALL.iter().copied().find(|c| c.name() == name)
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}
