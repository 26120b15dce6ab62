// フィールド対応付け
//
// 2つのスキーマスナップショット間でカラムを対応付けるための位置情報付き
// カラムリスト。リネームされたカラムでも、隣接カラムの位置関係と
// 名前以外の属性の一致によって対応付けを試みます。
//
// 前後の参照は所有権を持たないインデックス参照であり、位置の相関にのみ
// 使用されます。

use crate::core::schema::Column;

/// 位置情報付きカラムリスト
///
/// 定義順のカラム列を保持し、各カラムの前後隣接カラムへの参照を提供します。
#[derive(Debug, Clone, PartialEq)]
pub struct FieldList {
    fields: Vec<Column>,
}

impl FieldList {
    /// カラム列からリストを作成
    pub fn from_columns(columns: Vec<Column>) -> Self {
        Self { fields: columns }
    }

    /// カラム数を取得
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// 空かどうか
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// カラムを順に走査
    pub fn iter(&self) -> impl Iterator<Item = &Column> {
        self.fields.iter()
    }

    /// 指定位置のカラムを取得
    pub fn get(&self, index: usize) -> Option<&Column> {
        self.fields.get(index)
    }

    /// 指定された名前のカラム位置を取得
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|c| c.name == name)
    }

    /// 指定された名前のカラムを取得
    pub fn find(&self, name: &str) -> Option<&Column> {
        self.fields.iter().find(|c| c.name == name)
    }

    /// 指定位置の直前のカラムを取得
    pub fn previous(&self, index: usize) -> Option<&Column> {
        if index == 0 {
            None
        } else {
            self.fields.get(index - 1)
        }
    }

    /// 指定位置の直後のカラムを取得
    pub fn next(&self, index: usize) -> Option<&Column> {
        self.fields.get(index + 1)
    }

    /// ターゲットカラムをライブ側のカラムと対応付ける
    ///
    /// 1. ライブ側に同名カラムがあれば即座にそれを返す。
    /// 2. なければ、ターゲットの直前カラムにライブ側の同名カラムが
    ///    存在する場合、その直後のカラムを候補とする。
    /// 3. それも不成立なら、ターゲットの直後カラムに同名カラムが
    ///    存在する場合、その直前のカラムを候補とする。
    /// 4. 候補は名前以外の全属性がターゲットと一致する場合のみ採用される。
    ///    無関係なカラムをリネームと誤認しないための制約。
    ///
    /// # Arguments
    ///
    /// * `index` - ターゲットカラムのこのリスト内での位置
    /// * `live` - ライブスキーマ側のカラムリスト
    ///
    /// # Returns
    ///
    /// 対応付けられたライブ側カラム。対応付け不能ならNone。
    pub fn pair<'a>(&self, index: usize, live: &'a FieldList) -> Option<&'a Column> {
        let target = self.get(index)?;

        if let Some(found) = live.find(&target.name) {
            return Some(found);
        }

        // 直前隣接での対応付けが不成立なら、直後隣接での対応付けへ進む
        let candidate = self
            .previous(index)
            .and_then(|prev| live.index_of(&prev.name))
            .and_then(|live_index| live.next(live_index))
            .or_else(|| {
                self.next(index)
                    .and_then(|next| live.index_of(&next.name))
                    .and_then(|live_index| live.previous(live_index))
            });

        candidate.filter(|c| c.attributes_match(target))
    }
}

/// 2つのカラムが変更されているかどうか
///
/// 名前が異なる、または名前以外のいずれかの属性が異なる場合にtrue。
pub fn is_changed(a: &Column, b: &Column) -> bool {
    a.name != b.name || !a.attributes_match(b)
}
