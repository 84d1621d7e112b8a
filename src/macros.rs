//! Macros for ergonomic state declarations.

/// Generate a state enum with the derives and `State` impl the engine
/// expects.
///
/// # Example
///
/// ```
/// use waypoint::state_enum;
///
/// state_enum! {
///     pub enum OrderState {
///         Validate,
///         Charge,
///         Ship,
///         Error,
///     }
/// }
/// ```
#[macro_export]
macro_rules! state_enum {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            $(
                $(#[$variant_meta:meta])*
                $variant:ident
            ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(
            Clone,
            PartialEq,
            Eq,
            Hash,
            Debug,
            serde::Serialize,
            serde::Deserialize,
        )]
        $vis enum $name {
            $(
                $(#[$variant_meta])*
                $variant
            ),*
        }

        impl $crate::core::State for $name {
            fn name(&self) -> &str {
                match self {
                    $(Self::$variant => stringify!($variant)),*
                }
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use crate::core::State;

    state_enum! {
        enum TestState {
            Initial,
            Processing,
            Complete,
        }
    }

    #[test]
    fn state_enum_macro_generates_trait() {
        assert_eq!(TestState::Initial.name(), "Initial");
        assert_eq!(TestState::Complete.name(), "Complete");
    }

    #[test]
    fn state_enum_supports_visibility() {
        state_enum! {
            pub enum PublicState {
                A,
                B,
            }
        }

        assert_eq!(PublicState::B.name(), "B");
    }

    #[test]
    fn generated_enum_is_a_usable_state() {
        use std::collections::HashMap;

        let mut map: HashMap<TestState, u32> = HashMap::new();
        map.insert(TestState::Processing, 1);
        assert_eq!(map[&TestState::Processing], 1);

        let json = serde_json::to_string(&TestState::Initial).unwrap();
        let back: TestState = serde_json::from_str(&json).unwrap();
        assert_eq!(back, TestState::Initial);
    }
}
