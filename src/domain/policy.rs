use chrono::{DateTime, Utc};

use super::{IssueBookError, ReturnBookError, UserId, loan::Loan};

/// 延滞料金が発生しない猶予期間（日数）
pub const DEFAULT_GRACE_PERIOD_DAYS: f64 = 15.0;

/// 猶予期間を超えた1日あたりの延滞料金
pub const DEFAULT_FEE_PER_DAY: f64 = 2.0;

const MILLIS_PER_DAY: f64 = 86_400_000.0;

/// 貸出ポリシー
///
/// 延滞料金の計算と、貸出・返却の事前条件を扱う純粋なルール。
/// I/Oは一切行わない。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoanPolicy {
    pub grace_period_days: f64,
    pub fee_per_day: f64,
}

impl LoanPolicy {
    pub fn new(grace_period_days: f64, fee_per_day: f64) -> Self {
        Self {
            grace_period_days,
            fee_per_day,
        }
    }

    /// 純粋関数：延滞料金を計算する
    ///
    /// 経過日数は貸出時刻からの連続値（小数を含む）で数える。
    /// 暦日での切り捨ては行わない。
    ///
    /// - 経過日数が猶予期間以下なら0
    /// - それ以外は (経過日数 - 猶予期間) * 1日あたりの料金
    /// - 結果は負にならない
    pub fn compute_late_fee(&self, issued_at: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
        let days_elapsed = (now - issued_at).num_milliseconds() as f64 / MILLIS_PER_DAY;
        if days_elapsed <= self.grace_period_days {
            return 0.0;
        }
        ((days_elapsed - self.grace_period_days) * self.fee_per_day).max(0.0)
    }
}

impl Default for LoanPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_GRACE_PERIOD_DAYS, DEFAULT_FEE_PER_DAY)
    }
}

/// 純粋関数：貸出可能か判定する
///
/// ビジネスルール：
/// - 未返却の貸出がなければ貸出可能
/// - 同じ利用者に貸出中なら再貸出しない
/// - 他の利用者に貸出中なら貸出不可
///
/// 返却済みの貸出が渡された場合は妨げにならない。
pub fn can_issue(existing: Option<&Loan>, user_id: UserId) -> Result<(), IssueBookError> {
    match existing {
        Some(loan) if loan.is_open() && loan.user_id == user_id => {
            Err(IssueBookError::AlreadyIssuedToRequester)
        }
        Some(loan) if loan.is_open() => Err(IssueBookError::IssuedToAnotherUser),
        _ => Ok(()),
    }
}

/// 純粋関数：返却可能か判定する
///
/// 判定順：
/// 1. 貸出がない → NotIssued
/// 2. 貸出を受けた利用者と異なる → NotOwner
/// 3. 既に返却日がある → AlreadyReturned
pub fn can_return(open_loan: Option<&Loan>, user_id: UserId) -> Result<(), ReturnBookError> {
    let loan = open_loan.ok_or(ReturnBookError::NotIssued)?;

    if loan.user_id != user_id {
        return Err(ReturnBookError::NotOwner);
    }

    if !loan.is_open() {
        return Err(ReturnBookError::AlreadyReturned);
    }

    Ok(())
}
