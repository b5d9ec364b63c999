//! Kraken 자산 코드 정규화.
//!
//! Kraken은 레거시 자산 코드에 자산 클래스 접두사를 붙입니다
//! (`X` = 암호화폐, `Z` = 법정화폐). 예: `XXBT`, `ZUSD`.
//! 이 모듈은 거래소 코드를 대시보드에서 쓰는 정규 심볼로 변환합니다.
//!
//! 변환 규칙은 순수 함수이며 알려진 코드 집합 전체에 대해 전역적입니다.
//! 알 수 없는 코드는 원본 그대로 통과시킵니다.

/// Kraken 자산 코드를 정규 심볼로 변환합니다.
///
/// - 4글자 `X`/`Z` 접두 코드는 접두사를 제거합니다 (`XXBT` → `XBT`, `ZUSD` → `USD`)
/// - 거래소 별칭은 표준 심볼로 치환합니다 (`XBT` → `BTC`, `XDG` → `DOGE`)
/// - 그 외 코드는 그대로 반환합니다
pub fn canonical_asset(code: &str) -> String {
    let stripped = if code.len() == 4 && (code.starts_with('X') || code.starts_with('Z')) {
        &code[1..]
    } else {
        code
    };

    match stripped {
        "XBT" => "BTC".to_string(),
        "XDG" => "DOGE".to_string(),
        other => other.to_string(),
    }
}

/// `wsname`(예: `XBT/USD`)에서 표시 이름을 만듭니다.
///
/// `wsname`이 없으면 정규화된 기준/호가 심볼로 구성합니다.
pub fn display_name(wsname: Option<&str>, base: &str, quote: &str) -> String {
    match wsname {
        Some(name) => {
            // wsname 안의 거래소 별칭도 정규화 (XBT/USD → BTC/USD)
            match name.split_once('/') {
                Some((b, q)) => format!("{}/{}", canonical_asset(b), canonical_asset(q)),
                None => name.to_string(),
            }
        }
        None => format!("{}/{}", base, quote),
    }
}
