use std::fmt::{self, Display};

// 远端服务分配的实体 ID，统一用 i64 newtype 包装
macro_rules! define_id {
    ($name:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(i64);

        impl $name {
            pub fn as_i64(&self) -> i64 {
                self.0
            }
        }

        impl From<i64> for $name {
            fn from(id: i64) -> Self {
                Self(id)
            }
        }

        impl From<$name> for i64 {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

define_id!(TrackId);
define_id!(SetListId);
define_id!(SetListEntryId);
define_id!(WorkId);
define_id!(UserId);
define_id!(BandId);
define_id!(CommentId);
define_id!(VersionTypeId);

/// 数据可见范围：乐队共享或个人私有
///
/// 个人范围指 `band_id` 为空且由该用户创建的实体。
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Scope {
    Band(BandId),
    Personal(UserId),
}

impl Scope {
    /// 判断某个实体的归属是否落在此范围内
    pub fn contains(&self, band_id: Option<&BandId>, created_by: &UserId) -> bool {
        match self {
            Scope::Band(band) => band_id == Some(band),
            Scope::Personal(user) => band_id.is_none() && created_by == user,
        }
    }

    /// 根据实体归属推导范围
    pub fn of(band_id: Option<&BandId>, created_by: &UserId) -> Self {
        match band_id {
            Some(band) => Scope::Band(band.clone()),
            None => Scope::Personal(created_by.clone()),
        }
    }

    pub fn band_id(&self) -> Option<&BandId> {
        match self {
            Scope::Band(band) => Some(band),
            Scope::Personal(_) => None,
        }
    }
}

impl Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::Band(id) => write!(f, "band:{}", id),
            Scope::Personal(id) => write!(f, "personal:{}", id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_band_scope_contains_only_band_rows() {
        let scope = Scope::Band(BandId::from(7));
        assert!(scope.contains(Some(&BandId::from(7)), &UserId::from(1)));
        assert!(!scope.contains(Some(&BandId::from(8)), &UserId::from(1)));
        assert!(!scope.contains(None, &UserId::from(1)));
    }

    #[test]
    fn test_personal_scope_requires_no_band() {
        let scope = Scope::Personal(UserId::from(1));
        assert!(scope.contains(None, &UserId::from(1)));
        assert!(!scope.contains(None, &UserId::from(2)));
        assert!(!scope.contains(Some(&BandId::from(7)), &UserId::from(1)));
    }

    #[test]
    fn test_scope_of() {
        assert_eq!(
            Scope::of(Some(&BandId::from(3)), &UserId::from(1)),
            Scope::Band(BandId::from(3))
        );
        assert_eq!(Scope::of(None, &UserId::from(1)), Scope::Personal(UserId::from(1)));
    }
}
