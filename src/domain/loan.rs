use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{BookId, LoanId, UserId, policy::LoanPolicy};

/// 貸出記録 - 1冊の書籍の1回の貸出
///
/// 不変条件：
/// - 1冊につき returned_at が None の貸出は同時に1件まで
/// - late_fee は負にならない
///
/// 未返却の貸出を読み出した場合、late_fee にはその時点までの
/// 延滞料金の見込み額が入る（永続化はされない）。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Loan {
    pub loan_id: LoanId,
    pub book_id: BookId,
    pub user_id: UserId,
    pub issued_at: DateTime<Utc>,
    pub returned_at: Option<DateTime<Utc>>,
    pub late_fee: f64,
}

impl Loan {
    /// 未返却か
    pub fn is_open(&self) -> bool {
        self.returned_at.is_none()
    }
}

/// 純粋関数：書籍を貸し出す
///
/// 新しいIDを採番し、返却日なし・延滞料金0の貸出を生成する。
/// 副作用なし。
pub fn issue_loan(book_id: BookId, user_id: UserId, issued_at: DateTime<Utc>) -> Loan {
    Loan {
        loan_id: LoanId::new(),
        book_id,
        user_id,
        issued_at,
        returned_at: None,
        late_fee: 0.0,
    }
}

/// 純粋関数：書籍を返却する
///
/// 返却時点の連続日数で最終的な延滞料金を確定させる。
/// 副作用なし。返却済みの貸出を渡すと None。
pub fn close_loan(loan: &Loan, returned_at: DateTime<Utc>, policy: &LoanPolicy) -> Option<Loan> {
    if !loan.is_open() {
        return None;
    }

    Some(Loan {
        returned_at: Some(returned_at),
        late_fee: policy.compute_late_fee(loan.issued_at, returned_at),
        ..loan.clone()
    })
}

/// 純粋関数：延滞料金の見込み額を付与する
///
/// 未返却の貸出には now 時点の見込み額を、返却済みの貸出には
/// 確定済みの料金をそのまま残す。
pub fn with_fee_preview(loan: Loan, now: DateTime<Utc>, policy: &LoanPolicy) -> Loan {
    if loan.is_open() {
        let late_fee = policy.compute_late_fee(loan.issued_at, now);
        Loan { late_fee, ..loan }
    } else {
        loan
    }
}
