//! Status helper enums mapping to SMALLINT lookup tables.
//!
//! Each enum variant's discriminant matches the seed data in the
//! corresponding `*_statuses` table.

/// Status ID type matching SMALLINT/SMALLSERIAL in the database.
pub type StatusId = i16;

macro_rules! define_status_enum {
    (
        $(#[$meta:meta])*
        $name:ident {
            $( $(#[$vmeta:meta])* $variant:ident = $val:expr ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[repr(i16)]
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        pub enum $name {
            $( $(#[$vmeta])* $variant = $val ),+
        }

        impl $name {
            /// Return the database status ID.
            pub fn id(self) -> StatusId {
                self as StatusId
            }

            /// Resolve a database status ID.
            pub fn from_id(id: StatusId) -> Option<Self> {
                match id {
                    $( $val => Some($name::$variant), )+
                    _ => None,
                }
            }
        }

        impl From<$name> for StatusId {
            fn from(value: $name) -> Self {
                value as StatusId
            }
        }
    };
}

define_status_enum! {
    /// Like job lifecycle status.
    LikeJobStatus {
        Pending = 1,
        Running = 2,
        Completed = 3,
        Failed = 4,
        /// A newer pending job for the same key replaced this one.
        Superseded = 5,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_match_seed_data() {
        assert_eq!(LikeJobStatus::Pending.id(), 1);
        assert_eq!(LikeJobStatus::Running.id(), 2);
        assert_eq!(LikeJobStatus::Completed.id(), 3);
        assert_eq!(LikeJobStatus::Failed.id(), 4);
        assert_eq!(LikeJobStatus::Superseded.id(), 5);
    }

    #[test]
    fn from_id_roundtrip() {
        assert_eq!(LikeJobStatus::from_id(4), Some(LikeJobStatus::Failed));
        assert_eq!(LikeJobStatus::from_id(9), None);
    }
}
