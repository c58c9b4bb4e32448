use argon2::Argon2;
use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use lazy_static::lazy_static;
use std::collections::HashMap;
use thiserror::Error;

pub const MIN_PASSWORD_LENGTH: usize = 8;
const MAX_SIMILARITY: f64 = 0.7;

// 常见弱口令, 全部小写
static COMMON_PASSWORDS: &[&str] = &[
    "password", "password1", "password12", "password123", "passw0rd", "p@ssw0rd",
    "12345678", "123456789", "1234567890", "87654321", "11111111", "00000000",
    "qwertyui", "qwerty123", "qwertyuiop", "1q2w3e4r", "1qaz2wsx", "zaq12wsx",
    "abcd1234", "abc12345", "iloveyou", "sunshine", "princess", "football",
    "baseball", "welcome1", "welcome123", "letmein1", "trustno1", "superman",
    "starwars", "whatever", "dragon12", "monkey12", "admin123", "administrator",
    "changeme", "computer", "internet", "michelle", "jennifer", "corvette",
    "mercedes", "liverpool", "chelsea1", "asdfghjk", "asdf1234", "zxcvbnm1",
    "qazwsxedc", "aaaaaaaa", "secret123", "master12", "shadow12", "freedom1",
];

lazy_static! {
    // 用户不存在时也做一次校验, 使两条失败路径耗时接近
    static ref DUMMY_HASH: Option<String> = hash_password("clinic-dummy-password").ok();
}

#[derive(Debug, Error)]
pub enum PasswordError {
    #[error("password hashing failed: {0}")]
    Hash(String),
}

pub fn hash_password(password: &str) -> Result<String, PasswordError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| PasswordError::Hash(e.to_string()))
}

/// 哈希串无法解析时按校验失败处理.
pub fn verify_password(password: &str, password_hash: &str) -> bool {
    match PasswordHash::new(password_hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => false,
    }
}

pub fn dummy_verify(password: &str) {
    if let Some(hash) = DUMMY_HASH.as_ref() {
        let _ = verify_password(password, hash);
    }
}

/// 参与相似度检查的用户属性.
pub struct UserAttributes<'a> {
    pub username: &'a str,
    pub email: &'a str,
    pub first_name: &'a str,
    pub last_name: &'a str,
}

// 字符多重集重合度: 2 * 公共字符数 / 总长度
fn quick_ratio(a: &str, b: &str) -> f64 {
    let total = a.chars().count() + b.chars().count();
    if total == 0 {
        return 1.0;
    }
    let mut remaining: HashMap<char, usize> = HashMap::new();
    for c in b.chars() {
        *remaining.entry(c).or_default() += 1;
    }
    let mut matches = 0usize;
    for c in a.chars() {
        if let Some(n) = remaining.get_mut(&c) {
            if *n > 0 {
                *n -= 1;
                matches += 1;
            }
        }
    }
    2.0 * matches as f64 / total as f64
}

// 密码远长于属性值时, 属性值不可能达到相似度阈值
fn exceeds_length_ratio(password_len: usize, value_len: usize) -> bool {
    password_len >= 10 * value_len
        && (value_len as f64) < MAX_SIMILARITY / 2.0 * password_len as f64
}

fn too_similar(password: &str, value: &str) -> bool {
    let value = value.to_lowercase();
    if value.is_empty() {
        return false;
    }
    let password_len = password.chars().count();
    let mut parts: Vec<&str> = value
        .split(|c: char| !c.is_alphanumeric() && c != '_')
        .filter(|p| !p.is_empty())
        .collect();
    parts.push(value.as_str());
    parts.iter().any(|part| {
        !exceeds_length_ratio(password_len, part.chars().count())
            && quick_ratio(password, part) >= MAX_SIMILARITY
    })
}

/// 返回所有不满足的规则, 空表示通过.
pub fn validate_password(password: &str, attrs: &UserAttributes<'_>) -> Vec<String> {
    let mut errors = Vec::new();
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        errors.push(format!(
            "This password is too short. It must contain at least {} characters.",
            MIN_PASSWORD_LENGTH
        ));
    }
    let lowered = password.to_lowercase();
    for (value, name) in [
        (attrs.username, "username"),
        (attrs.email, "email address"),
        (attrs.first_name, "first name"),
        (attrs.last_name, "last name"),
    ] {
        if too_similar(&lowered, value) {
            errors.push(format!("The password is too similar to the {}.", name));
            break;
        }
    }
    if COMMON_PASSWORDS.contains(&lowered.trim()) {
        errors.push("This password is too common.".to_string());
    }
    if !password.is_empty() && password.chars().all(|c| c.is_ascii_digit()) {
        errors.push("This password is entirely numeric.".to_string());
    }
    errors
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attrs() -> UserAttributes<'static> {
        UserAttributes {
            username: "alice",
            email: "alice@example.com",
            first_name: "Alice",
            last_name: "Liddell",
        }
    }

    #[test]
    fn test_hash_and_verify() {
        let hash = hash_password("Str0ng!Passw0rd").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password("Str0ng!Passw0rd", &hash));
        assert!(!verify_password("wrong", &hash));
        assert!(!verify_password("Str0ng!Passw0rd", "not-a-phc-string"));
    }

    #[test]
    fn test_strong_password_passes() {
        assert!(validate_password("Tr1cky-Harbor-42", &attrs()).is_empty());
    }

    #[test]
    fn test_policy_rejections() {
        let short = validate_password("a1b2", &attrs());
        assert!(short[0].contains("too short"));

        let numeric = validate_password("9731846205", &attrs());
        assert_eq!(numeric, vec!["This password is entirely numeric.".to_string()]);

        let common = validate_password("Password123", &attrs());
        assert_eq!(common, vec!["This password is too common.".to_string()]);

        let similar = validate_password("alice123!", &attrs());
        assert_eq!(
            similar,
            vec!["The password is too similar to the username.".to_string()]
        );
    }

    #[test]
    fn test_email_domain_does_not_count_as_similar() {
        let attrs = UserAttributes {
            username: "bob",
            email: "bob@gmail.com",
            first_name: "Robert",
            last_name: "Smith",
        };
        assert!(validate_password("Welcome-Harbor-42", &attrs).is_empty());
        assert!(validate_password("Tr1cky-Harbor-42.org", &attrs).is_empty());
        // 与邮箱整体高度相似仍然拒绝
        assert_eq!(
            validate_password("bob@gmail.co", &attrs),
            vec!["The password is too similar to the email address.".to_string()]
        );
    }

    #[test]
    fn test_short_attribute_inside_password_passes() {
        let attrs = UserAttributes {
            username: "al",
            email: "",
            first_name: "",
            last_name: "",
        };
        assert!(validate_password("Tr1cky-al-Harbor", &attrs).is_empty());
    }
}
