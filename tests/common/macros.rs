/// Asserts the value of one register of a context.
#[macro_export]
macro_rules! assert_register {
    ($hw:expr, $ctx:expr, $reg:expr, $value:expr) => {
        let context = $hw.context($ctx).expect("Context not found");
        assert_eq!(
            context.reg_value($reg),
            $value,
            "Context {} register {} mismatch",
            $ctx,
            $reg
        );
    };
}

/// Asserts the position of a context's head.
#[macro_export]
macro_rules! assert_head {
    ($hw:expr, $ctx:expr, $kind:expr, $pos:expr) => {
        let context = $hw.context($ctx).expect("Context not found");
        assert_eq!(
            context.head($kind).position(),
            $pos,
            "Context {} head {:?} position mismatch",
            $ctx,
            $kind
        );
    };
}

/// Asserts the instruction pointer of a context.
#[macro_export]
macro_rules! assert_ip {
    ($hw:expr, $ctx:expr, $pos:expr) => {
        $crate::assert_head!($hw, $ctx, evolvm_lib::model::head::HeadKind::Ip, $pos);
    };
}

/// Asserts that a locus of a memory space carries a flag.
#[macro_export]
macro_rules! assert_flag {
    ($space:expr, $pos:expr, $flag:expr) => {
        assert!(
            $space.has_flag($pos, $flag),
            "Locus {} lacks flag {:?}",
            $pos,
            $flag
        );
    };
}

/// Asserts the status of a context.
#[macro_export]
macro_rules! assert_status {
    ($hw:expr, $ctx:expr, $pattern:pat) => {
        let context = $hw.context($ctx).expect("Context not found");
        assert!(
            matches!(context.status, $pattern),
            "Context {} has status {:?}",
            $ctx,
            context.status
        );
    };
}
