use crate::domain::{
    book::{Book, NewBook},
    value_objects::BookId,
};
use async_trait::async_trait;

/// 削除の結果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    NotFound,
    /// 未返却の貸出があるため削除しなかった
    HasOpenLoan,
}

pub type Result<T> = std::result::Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// 書籍カタログポート
///
/// 貸出処理からは書籍の存在確認（GetBookByID）に使われる。
/// 貸出中フラグはここからは書き換えない。
#[async_trait]
pub trait BookCatalog: Send + Sync {
    /// IDで書籍を取得する
    async fn get_book(&self, book_id: BookId) -> Result<Option<Book>>;

    /// すべての書籍を取得する
    async fn list_books(&self) -> Result<Vec<Book>>;

    /// タイトルで書籍を検索する
    ///
    /// タイトル重複の確認に使われる。
    async fn find_book_by_title(&self, title: &str) -> Result<Option<Book>>;

    /// 書籍を登録する
    ///
    /// 著者と配架場所は名前で既存のものを引き、なければ作成する。
    async fn create_book(&self, book: NewBook) -> Result<Book>;

    /// 書籍を削除する
    ///
    /// 未返却の貸出の確認と削除は1つの作業単位で行い、
    /// 貸出中なら何も変更せずに HasOpenLoan を返す。
    /// 返却済みの貸出記録は書籍と一緒に削除される。
    async fn delete_book(&self, book_id: BookId) -> Result<DeleteOutcome>;
}
