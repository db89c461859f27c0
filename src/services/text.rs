//! # 텍스트 통계 유틸리티
//!
//! 에디터 본문은 HTML 조각(리치 텍스트)으로 저장됩니다.
//! 태그를 걷어낸 뒤 공백으로 나누어 단어를 셉니다.

/// 리치 텍스트 본문의 단어 수를 계산합니다.
///
/// `<p>`, `<br>` 같은 태그는 공백으로 바꿔서 `<p>첫</p><p>둘</p>`이
/// 한 단어로 붙지 않게 합니다. 한글 어절도 공백 기준으로 하나씩 셉니다.
///
/// # 예시
/// ```
/// use tecindo_sync::services::count_words;
/// assert_eq!(count_words("<p>나의 첫 글</p>"), 3);
/// assert_eq!(count_words("plain text"), 2);
/// ```
pub fn count_words(content: &str) -> usize {
    strip_tags(content).split_whitespace().count()
}

/// `count_words`의 i64 버전 (SQLite INTEGER에 바로 바인딩)
pub fn word_count_i64(content: &str) -> i64 {
    i64::try_from(count_words(content)).unwrap_or(i64::MAX)
}

// 태그 안쪽 문자는 버리고, 태그 자리는 공백 하나로 바꿉니다.
fn strip_tags(content: &str) -> String {
    let mut out = String::with_capacity(content.len());
    let mut in_tag = false;
    for ch in content.chars() {
        match ch {
            '<' => {
                in_tag = true;
                out.push(' ');
            }
            '>' if in_tag => in_tag = false,
            _ if !in_tag => out.push(ch),
            _ => {}
        }
    }
    out.replace("&nbsp;", " ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_plain_and_korean_text() {
        assert_eq!(count_words(""), 0);
        assert_eq!(count_words("   "), 0);
        assert_eq!(count_words("hello world"), 2);
        assert_eq!(count_words("오늘은 비가 온다"), 3);
    }

    #[test]
    fn tags_separate_words() {
        assert_eq!(count_words("<p>first</p><p>second</p>"), 2);
        assert_eq!(count_words("<p>a<br/>b</p>"), 2);
        assert_eq!(count_words("<h1 class=\"title\">제목</h1>"), 1);
        assert_eq!(count_words("one&nbsp;two"), 2);
    }
}
